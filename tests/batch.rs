mod common;

use std::path::PathBuf;

use common::{ClrSpec, ImageBuilder, ImportSpec};
use pescope::prelude::*;

struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("pescope-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        Scratch { dir }
    }

    fn write(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[test]
fn from_file() {
    let scratch = Scratch::new("single");
    let path = scratch.write(
        "native.exe",
        &ImageBuilder::pe32()
            .section(".text", 0x1000, common::text())
            .imports(vec![ImportSpec::new("KERNEL32.dll").named(0, "ExitProcess")])
            .build(),
    );

    let image = PeImage::from_file(&path).unwrap();
    assert_eq!(image.dependencies(), &["KERNEL32.dll".to_string()]);

    let missing = scratch.dir.join("missing.exe");
    assert!(matches!(
        PeImage::from_file(&missing),
        Err(Error::FileError(_))
    ));
}

#[test]
fn parallel_batch() {
    let scratch = Scratch::new("batch");
    let mut paths = Vec::new();

    for index in 0..12 {
        let data = if index % 3 == 0 {
            ImageBuilder::pe32_plus()
                .section(".text", 0x1000, common::text())
                .clr(ClrSpec::new(0x0000_0001))
                .build()
        } else {
            ImageBuilder::pe32()
                .section(".text", 0x1000, common::text())
                .imports(vec![ImportSpec::new(&format!("DEP{}.dll", index)).ordinal(1)])
                .build()
        };
        paths.push(scratch.write(&format!("image{}.bin", index), &data));
    }
    paths.push(scratch.write("garbage.bin", b"this is not an image"));

    let results = PeImage::from_files_parallel(&paths, ParserConfig::default());
    assert_eq!(results.len(), 13);

    for (index, result) in results.iter().take(12).enumerate() {
        let image = result.as_ref().unwrap();
        if index % 3 == 0 {
            assert_eq!(image.bitness(), Bitness::Pe32Plus);
            assert!(image.is_managed());
        } else {
            assert_eq!(image.dependencies(), &[format!("DEP{}.dll", index)]);
        }
    }
    assert!(matches!(results[12], Err(Error::NotPeFile(_))));
}
