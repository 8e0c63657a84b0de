//! CLR 2.0 (Cor20) header parsing for .NET assemblies.
//!
//! The COR20 header is located by the `ClrRuntimeHeader` data directory. It locates the
//! metadata root, carries the runtime flags that decide the target architecture, and names the
//! managed (or native) entry point.
//!
//! # Reference
//! - [ECMA-335 II.25.3.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::fmt;

use bitflags::bitflags;

use crate::{
    file::parser::Parser,
    metadata::token::Token,
    Result,
};

/// Size of the header, and the only valid value of `cb`
pub const COR20_HEADER_SIZE: usize = 72;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// Runtime flags of the COR20 header
    pub struct ClrFlags : u32 {
        /// The image contains IL code only
        const IL_ONLY = 0x0000_0001;
        /// The image can only be loaded into a 32-bit process
        const REQUIRES_32BIT = 0x0000_0002;
        /// The image is an IL library
        const IL_LIBRARY = 0x0000_0004;
        /// The image carries a strong name signature
        const STRONG_NAME_SIGNED = 0x0000_0008;
        /// The entry point is a native RVA rather than a metadata token
        const NATIVE_ENTRYPOINT = 0x0000_0010;
        /// The runtime tracks debug data
        const TRACK_DEBUG_DATA = 0x0001_0000;
        /// The image prefers a 32-bit process where one is available. This is
        /// `COMIMAGE_FLAGS_32BITPREFERRED` (bit 17); bit 18 has no meaning.
        const PREFERS_32BIT = 0x0002_0000;
    }
}

impl ClrFlags {
    /// Names of the set flags, in bit order. Bits without a name are not listed.
    #[must_use]
    pub fn descriptions(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// Target architecture of a managed image, derived from its runtime flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Architecture {
    /// Runs in a 32-bit process only, or prefers one
    X86,
    /// Runs as 32 or 64 bit, whatever the host process is
    AnyCpu,
}

impl Architecture {
    /// Classify `flags`: `REQUIRES_32BIT` or `PREFERS_32BIT` select x86, anything else is
    /// AnyCPU.
    ///
    /// ```rust
    /// use pescope::metadata::cor20header::{Architecture, ClrFlags};
    ///
    /// assert_eq!(Architecture::from_flags(ClrFlags::from_bits_retain(0x1)), Architecture::AnyCpu);
    /// assert_eq!(Architecture::from_flags(ClrFlags::from_bits_retain(0x3)), Architecture::X86);
    /// ```
    #[must_use]
    pub fn from_flags(flags: ClrFlags) -> Self {
        if flags.contains(ClrFlags::REQUIRES_32BIT) || flags.contains(ClrFlags::PREFERS_32BIT) {
            Architecture::X86
        } else {
            Architecture::AnyCpu
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86 => write!(f, "x86"),
            Architecture::AnyCpu => write!(f, "AnyCPU"),
        }
    }
}

/// The entry point named by the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryPoint {
    /// No entry point, e.g. a library
    None,
    /// A `MethodDef` or `File` token
    Token(Token),
    /// RVA of native code, when `NATIVE_ENTRYPOINT` is set
    Rva(u32),
}

/// The COR20 header, every field in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Cor20Header {
    pub cb: u32,
    pub major_runtime_version: u16,
    pub minor_runtime_version: u16,
    pub meta_data_rva: u32,
    pub meta_data_size: u32,
    pub flags: u32,
    pub entry_point_token: u32,
    pub resource_rva: u32,
    pub resource_size: u32,
    pub strong_name_signature_rva: u32,
    pub strong_name_signature_size: u32,
    pub code_manager_table_rva: u32,
    pub code_manager_table_size: u32,
    pub vtable_fixups_rva: u32,
    pub vtable_fixups_size: u32,
    pub export_address_table_jmp_rva: u32,
    pub export_address_table_jmp_size: u32,
    pub managed_native_header_rva: u32,
    pub managed_native_header_size: u32,
}

impl Cor20Header {
    /// Decode the header at the start of `data`.
    ///
    /// In `strict` mode the header must declare `cb == 72` and leave the reserved code
    /// manager table, export address table jump and managed native header fields zero.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if fewer than 72 bytes are available, or a
    /// malformed error when a strict check fails.
    pub fn read(data: &[u8], strict: bool) -> Result<Cor20Header> {
        let mut parser = Parser::new(data);
        parser.ensure_remaining(COR20_HEADER_SIZE)?;

        let header = Cor20Header {
            cb: parser.read_le::<u32>()?,
            major_runtime_version: parser.read_le::<u16>()?,
            minor_runtime_version: parser.read_le::<u16>()?,
            meta_data_rva: parser.read_le::<u32>()?,
            meta_data_size: parser.read_le::<u32>()?,
            flags: parser.read_le::<u32>()?,
            entry_point_token: parser.read_le::<u32>()?,
            resource_rva: parser.read_le::<u32>()?,
            resource_size: parser.read_le::<u32>()?,
            strong_name_signature_rva: parser.read_le::<u32>()?,
            strong_name_signature_size: parser.read_le::<u32>()?,
            code_manager_table_rva: parser.read_le::<u32>()?,
            code_manager_table_size: parser.read_le::<u32>()?,
            vtable_fixups_rva: parser.read_le::<u32>()?,
            vtable_fixups_size: parser.read_le::<u32>()?,
            export_address_table_jmp_rva: parser.read_le::<u32>()?,
            export_address_table_jmp_size: parser.read_le::<u32>()?,
            managed_native_header_rva: parser.read_le::<u32>()?,
            managed_native_header_size: parser.read_le::<u32>()?,
        };

        if strict {
            header.validate()?;
        } else if header.cb as usize != COR20_HEADER_SIZE {
            log::debug!("CLR header declares cb = {}, expected 72", header.cb);
        }

        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.cb as usize != COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                self.cb
            ));
        }

        if self.code_manager_table_rva != 0 || self.code_manager_table_size != 0 {
            return Err(malformed_error!(
                "Code Manager Table fields must be zero (reserved)"
            ));
        }

        if self.export_address_table_jmp_rva != 0 || self.export_address_table_jmp_size != 0 {
            return Err(malformed_error!(
                "Export Address Table Jump fields must be zero (reserved)"
            ));
        }

        if self.managed_native_header_rva != 0 || self.managed_native_header_size != 0 {
            return Err(malformed_error!(
                "Managed Native Header fields must be zero (reserved)"
            ));
        }

        Ok(())
    }

    /// The runtime flags. Unknown bits are retained.
    #[must_use]
    pub fn clr_flags(&self) -> ClrFlags {
        ClrFlags::from_bits_retain(self.flags)
    }

    /// The target architecture.
    #[must_use]
    pub fn architecture(&self) -> Architecture {
        Architecture::from_flags(self.clr_flags())
    }

    /// The entry point, interpreted according to `NATIVE_ENTRYPOINT`.
    #[must_use]
    pub fn entry_point(&self) -> EntryPoint {
        if self.entry_point_token == 0 {
            EntryPoint::None
        } else if self.clr_flags().contains(ClrFlags::NATIVE_ENTRYPOINT) {
            EntryPoint::Rva(self.entry_point_token)
        } else {
            EntryPoint::Token(Token::new(self.entry_point_token))
        }
    }

    /// Returns `true` if the header locates a strong name signature.
    #[must_use]
    pub fn has_strong_name_signature(&self) -> bool {
        self.strong_name_signature_rva != 0 && self.strong_name_signature_size != 0
    }
}
