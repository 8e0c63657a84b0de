mod common;

use common::{ClrSpec, ImageBuilder, MetadataSpec, TypeSpec};
use pescope::prelude::*;

fn managed(clr: ClrSpec) -> PeImage {
    let data = ImageBuilder::pe32()
        .dll()
        .section(".text", 0x1000, common::text())
        .clr(clr)
        .build();
    PeImage::from_mem(data).unwrap()
}

fn sample_types() -> Vec<TypeSpec> {
    vec![
        TypeSpec::new(0x0000_0000, "", "<Module>"),
        TypeSpec::new(0x0010_0001, "Contoso.Widgets", "Widget"),
        TypeSpec::new(0x0010_0000, "Contoso.Widgets", "Internal"),
        TypeSpec::new(0x0000_0002, "Contoso.Widgets", "Nested"),
        TypeSpec::new(0x0000_00A1, "", "GlobalHelpers"),
    ]
}

#[test]
fn any_cpu() {
    let image = managed(ClrSpec::new(0x0000_0001));
    assert!(image.is_managed());
    assert_eq!(image.status().clr, StageStatus::Parsed);

    let clr = image.clr().unwrap();
    assert_eq!(clr.architecture, Architecture::AnyCpu);
    assert_eq!(clr.architecture.to_string(), "AnyCPU");
    assert_eq!(clr.flags, vec!["IL_ONLY"]);
    assert_eq!(clr.header.major_runtime_version, 2);
    assert_eq!(clr.header.minor_runtime_version, 5);
    assert_eq!(clr.entry_point(), EntryPoint::Token(Token::new(0x0600_0001)));
}

#[test]
fn x86_flags() {
    let image = managed(ClrSpec::new(0x0000_0003));
    let clr = image.clr().unwrap();
    assert_eq!(clr.architecture, Architecture::X86);
    assert_eq!(clr.architecture.to_string(), "x86");
    assert_eq!(clr.flags, vec!["IL_ONLY", "REQUIRES_32BIT"]);

    let image = managed(ClrSpec::new(0x0002_0001));
    assert_eq!(image.clr().unwrap().architecture, Architecture::X86);

    let image = managed(ClrSpec::new(0x0004_0001));
    let clr = image.clr().unwrap();
    assert_eq!(clr.architecture, Architecture::AnyCpu);
    assert_eq!(clr.flags, vec!["IL_ONLY"]);
}

#[test]
fn native_entry_point() {
    let clr = ClrSpec {
        entry_point: 0x1000,
        ..ClrSpec::new(0x0000_0010)
    };
    let image = managed(clr);
    assert_eq!(image.clr().unwrap().entry_point(), EntryPoint::Rva(0x1000));
}

#[test]
fn metadata_summary() {
    let metadata = MetadataSpec {
        types: sample_types(),
        ..MetadataSpec::default()
    };
    let image = managed(ClrSpec::new(0x0000_0001).metadata(metadata));

    let clr = image.clr().unwrap();
    assert!(clr.metadata_error.is_none());
    let info = clr.metadata.as_ref().unwrap();

    assert_eq!(info.version, "v4.0.30319");
    let streams: Vec<&str> = info.streams.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(streams, vec!["#~", "#Strings", "#GUID"]);

    assert_eq!(info.tables.len(), 2);
    assert_eq!(info.tables[0].table_id, TableId::Module);
    assert_eq!(info.tables[0].row_count, 1);
    assert_eq!(info.tables[0].row_size, 10);
    assert_eq!(info.tables[1].table_id, TableId::TypeDef);
    assert_eq!(info.tables[1].row_count, 5);
    assert_eq!(info.tables[1].row_size, 14);

    assert_eq!(info.module_name.as_deref(), Some("Sample.dll"));
    assert_eq!(
        info.mvid.unwrap().to_string().to_ascii_lowercase(),
        "12345678-1234-5678-1234-56789abcdef0"
    );
    assert_eq!(
        info.public_types,
        vec!["Contoso.Widgets.Widget".to_string(), "GlobalHelpers".to_string()]
    );
    assert!(info.unknown_tables.is_empty());
    assert!(info.issues.is_empty());
}

#[test]
fn wide_string_indices() {
    let metadata = MetadataSpec {
        types: sample_types(),
        large_strings: true,
        type_refs: 3,
        ..MetadataSpec::default()
    };
    let image = managed(ClrSpec::new(0x0000_0001).metadata(metadata));
    let info = image.clr().unwrap().metadata.as_ref().unwrap();

    assert_eq!(info.tables.len(), 3);
    assert_eq!(info.tables[0].row_size, 12);
    assert_eq!(info.tables[1].table_id, TableId::TypeRef);
    assert_eq!(info.tables[1].row_size, 10);
    assert_eq!(info.tables[2].row_size, 18);
    assert_eq!(info.module_name.as_deref(), Some("Sample.dll"));
    assert_eq!(info.public_types.len(), 2);
}

#[test]
fn strings_follow_tables() {
    let metadata = MetadataSpec {
        types: sample_types(),
        strings_stream: false,
        extra_data: true,
        ..MetadataSpec::default()
    };
    let image = managed(ClrSpec::new(0x0000_0001).metadata(metadata));
    let info = image.clr().unwrap().metadata.as_ref().unwrap();

    assert!(info.streams.iter().all(|stream| stream.name != "#Strings"));
    assert_eq!(info.module_name.as_deref(), Some("Sample.dll"));
    assert_eq!(
        info.public_types,
        vec!["Contoso.Widgets.Widget".to_string(), "GlobalHelpers".to_string()]
    );
}

#[test]
fn strings_follow_many_tables() {
    let extra_tables = vec![
        (0x04, 3),
        (0x06, 0x4000),
        (0x08, 2),
        (0x0A, 4),
        (0x0C, 5),
        (0x20, 1),
    ];

    // Row sizes of TypeDef, Field, MethodDef, Param, MemberRef, CustomAttribute, Assembly
    for (large_strings, sizes) in [
        (false, [14, 6, 14, 6, 8, 10, 22]),
        (true, [18, 8, 16, 8, 10, 10, 26]),
    ] {
        let metadata = MetadataSpec {
            types: sample_types(),
            strings_stream: false,
            large_strings,
            extra_tables: extra_tables.clone(),
            ..MetadataSpec::default()
        };
        let image = managed(ClrSpec::new(0x0000_0001).metadata(metadata));
        let info = image.clr().unwrap().metadata.as_ref().unwrap();

        let tables: Vec<(TableId, u32)> = info
            .tables
            .iter()
            .skip(1)
            .map(|table| (table.table_id, table.row_size))
            .collect();
        assert_eq!(
            tables,
            vec![
                (TableId::TypeDef, sizes[0]),
                (TableId::Field, sizes[1]),
                (TableId::MethodDef, sizes[2]),
                (TableId::Param, sizes[3]),
                (TableId::MemberRef, sizes[4]),
                (TableId::CustomAttribute, sizes[5]),
                (TableId::Assembly, sizes[6]),
            ]
        );

        assert_eq!(info.module_name.as_deref(), Some("Sample.dll"));
        assert_eq!(
            info.public_types,
            vec!["Contoso.Widgets.Widget".to_string(), "GlobalHelpers".to_string()]
        );
        assert!(info.issues.is_empty());
    }
}

#[test]
fn nested_types_with_public_bit() {
    let metadata = MetadataSpec {
        types: vec![
            TypeSpec::new(0x0000_0001, "Outer", "Api"),
            TypeSpec::new(0x0000_0003, "Outer", "PrivateChild"),
            TypeSpec::new(0x0000_0005, "Outer", "AssemblyChild"),
            TypeSpec::new(0x0000_0007, "Outer", "FamOrAssemChild"),
            TypeSpec::new(0x0000_0006, "Outer", "FamAndAssemChild"),
        ],
        ..MetadataSpec::default()
    };
    let image = managed(ClrSpec::new(0x0000_0001).metadata(metadata));
    let info = image.clr().unwrap().metadata.as_ref().unwrap();

    assert_eq!(
        info.public_types,
        vec![
            "Outer.Api".to_string(),
            "Outer.PrivateChild".to_string(),
            "Outer.AssemblyChild".to_string(),
            "Outer.FamOrAssemChild".to_string()
        ]
    );
}

#[test]
fn unknown_table() {
    let metadata = MetadataSpec {
        types: sample_types(),
        unknown_table: true,
        ..MetadataSpec::default()
    };
    let image = managed(ClrSpec::new(0x0000_0001).metadata(metadata));
    let info = image.clr().unwrap().metadata.as_ref().unwrap();

    assert_eq!(info.unknown_tables, vec![0x30]);
    assert_eq!(info.module_name.as_deref(), Some("Sample.dll"));
    assert_eq!(info.public_types.len(), 2);
    assert!(info.issues.is_empty());
}

#[test]
fn unknown_table_hides_trailing_strings() {
    let metadata = MetadataSpec {
        types: sample_types(),
        unknown_table: true,
        strings_stream: false,
        ..MetadataSpec::default()
    };
    let image = managed(ClrSpec::new(0x0000_0001).metadata(metadata));
    assert_eq!(image.status().clr, StageStatus::Parsed);

    let info = image.clr().unwrap().metadata.as_ref().unwrap();
    assert_eq!(info.tables.len(), 2);
    assert_eq!(info.module_name, None);
    assert!(info.public_types.is_empty());
    assert_eq!(info.issues.len(), 1);
}

#[test]
fn type_discovery_disabled() {
    let metadata = MetadataSpec {
        types: sample_types(),
        ..MetadataSpec::default()
    };
    let data = ImageBuilder::pe32()
        .section(".text", 0x1000, common::text())
        .clr(ClrSpec::new(0x0000_0001).metadata(metadata))
        .build();
    let config = ParserConfig {
        discover_public_types: false,
        ..ParserConfig::default()
    };

    let image = PeImage::from_mem_with_config(data, config).unwrap();
    let info = image.clr().unwrap().metadata.as_ref().unwrap();
    assert_eq!(info.module_name.as_deref(), Some("Sample.dll"));
    assert!(info.public_types.is_empty());
}

#[test]
fn strict_header_checks() {
    let reserved = ClrSpec {
        reserved_nonzero: true,
        ..ClrSpec::new(0x0000_0001)
    };
    let data = ImageBuilder::pe32()
        .section(".text", 0x1000, common::text())
        .clr(reserved.clone())
        .build();

    let lenient = PeImage::from_mem(data.clone()).unwrap();
    assert_eq!(lenient.status().clr, StageStatus::Parsed);
    assert_eq!(lenient.clr().unwrap().header.code_manager_table_rva, 0x2000);

    let strict = PeImage::from_mem_with_config(data, ParserConfig::strict()).unwrap();
    assert!(strict.status().clr.is_failed());
    assert!(strict.clr().is_none());

    let short = ClrSpec {
        cb: 0x48 - 8,
        ..ClrSpec::new(0x0000_0001)
    };
    let data = ImageBuilder::pe32()
        .section(".text", 0x1000, common::text())
        .clr(short)
        .build();
    assert!(PeImage::from_mem(data.clone()).unwrap().clr().is_some());
    let strict = PeImage::from_mem_with_config(data, ParserConfig::strict()).unwrap();
    assert!(strict.status().clr.is_failed());
}

#[test]
fn header_without_metadata() {
    let clr = ClrSpec {
        metadata: None,
        ..ClrSpec::new(0x0000_0001)
    };
    let image = managed(clr);

    let clr = image.clr().unwrap();
    assert!(clr.metadata.is_none());
    assert!(clr.metadata_error.is_none());
    assert_eq!(image.status().clr, StageStatus::Parsed);
}

#[test]
fn broken_metadata_keeps_header() {
    let mut data = ImageBuilder::pe32()
        .section(".text", 0x1000, common::text())
        .clr(ClrSpec::new(0x0000_0003))
        .build();

    let signature = data
        .windows(4)
        .position(|window| window == b"BSJB")
        .unwrap();
    data[signature] = b'X';

    let image = PeImage::from_mem(data).unwrap();
    assert_eq!(image.status().clr, StageStatus::Parsed);

    let clr = image.clr().unwrap();
    assert_eq!(clr.architecture, Architecture::X86);
    assert!(clr.metadata.is_none());
    assert!(clr.metadata_error.is_some());
}
