//! Attribute certificate locator.
//!
//! Authenticode signatures live in the certificate table, the one data directory whose address
//! is a file offset rather than an RVA; the table is not mapped into memory by the loader. Only
//! the `WIN_CERTIFICATE` header of the first entry is decoded here. The certificate blob itself
//! is handed to callers untouched, no cryptographic verification takes place.

use crate::{
    file::{parser::Parser, pe::header::DataDirectoryKind, File},
    Result,
};

/// `WIN_CERT_TYPE_PKCS_SIGNED_DATA`, the type used by Authenticode
pub const WIN_CERT_TYPE_PKCS_SIGNED_DATA: u16 = 0x0002;

/// Header of the first entry of the attribute certificate table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// File offset of the certificate table
    pub offset: u32,
    /// Size of the certificate table as declared by the data directory
    pub size: u32,
    /// `dwLength` of the first entry, header included
    pub length: u32,
    /// `wRevision`, 0x0100 or 0x0200
    pub revision: u16,
    /// `wCertificateType`
    pub certificate_type: u16,
}

impl CertificateInfo {
    /// Locate the certificate table and decode the header of its first entry.
    ///
    /// Returns `None` if the image carries no certificate.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the table lies outside the file, or a
    /// malformed error if the entry length is inconsistent with the table size.
    pub fn parse(file: &File) -> Result<Option<CertificateInfo>> {
        let Some(directory) = file.data_directory(DataDirectoryKind::Certificate) else {
            return Ok(None);
        };

        let offset = directory.virtual_address;
        let table = file.data_slice(offset as usize, directory.size as usize)?;

        let mut parser = Parser::new(table);
        let length = parser.read_le::<u32>()?;
        let revision = parser.read_le::<u16>()?;
        let certificate_type = parser.read_le::<u16>()?;

        if length < 8 || length > directory.size {
            return Err(malformed_error!(
                "Certificate length {} does not fit the table of {} bytes",
                length,
                directory.size
            ));
        }

        log::debug!(
            "Found certificate of type {} ({} bytes) at 0x{:x}",
            certificate_type_name(certificate_type),
            length,
            offset
        );

        Ok(Some(CertificateInfo {
            offset,
            size: directory.size,
            length,
            revision,
            certificate_type,
        }))
    }

    /// Returns `true` for a PKCS#7 `SignedData` (Authenticode) certificate.
    #[must_use]
    pub fn is_authenticode(&self) -> bool {
        self.certificate_type == WIN_CERT_TYPE_PKCS_SIGNED_DATA
    }

    /// Human readable certificate type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        certificate_type_name(self.certificate_type)
    }
}

fn certificate_type_name(certificate_type: u16) -> &'static str {
    match certificate_type {
        0x0001 => "X509",
        WIN_CERT_TYPE_PKCS_SIGNED_DATA => "PKCS_SIGNED_DATA",
        0x0003 => "RESERVED_1",
        0x0004 => "TS_STACK_SIGNED",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::ImageBuilder;

    #[test]
    fn authenticode() {
        let image = ImageBuilder::pe32()
            .certificate(0x0200, 0x0002, vec![0x30, 0x82, 0x01, 0x00])
            .build();
        let file = File::from_mem(image).unwrap();

        let info = CertificateInfo::parse(&file).unwrap().unwrap();
        assert_eq!(info.length, 12);
        assert_eq!(info.revision, 0x0200);
        assert!(info.is_authenticode());
        assert_eq!(info.type_name(), "PKCS_SIGNED_DATA");
        assert_eq!(
            file.data_slice(info.offset as usize + 8, 4).unwrap(),
            &[0x30, 0x82, 0x01, 0x00]
        );
    }

    #[test]
    fn absent_and_damaged() {
        let file = File::from_mem(ImageBuilder::pe32().build()).unwrap();
        assert_eq!(CertificateInfo::parse(&file).unwrap(), None);

        let image = ImageBuilder::pe32().directory(4, 0x0010_0000, 0x100).build();
        let file = File::from_mem(image).unwrap();
        assert!(CertificateInfo::parse(&file).is_err());
    }
}
