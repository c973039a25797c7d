//! LUN lines
//!
//! A LUN maps a backing store into a target:
//!
//! ```text
//! Lun 0 Path=/dev/sdc,Type=fileio,ScsiId=xyz,ScsiSN=xyz,IOMode=wb,BlockSize=512
//! ```

use crate::document::first_token;
use crate::error::{IetError, IetResult};
use std::collections::BTreeSet;

/// A parsed `Lun` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lun {
    pub id: u32,
    /// `Key=Value` pairs in file order, keys lower-cased
    pub params: Vec<(String, String)>,
}

impl Lun {
    /// Parse a config line.
    ///
    /// Returns `Ok(None)` for lines that are not LUN definitions.
    pub fn parse(line: &str) -> IetResult<Option<Lun>> {
        if first_token(line) != Some("Lun") {
            return Ok(None);
        }

        let rest = line.trim_start()["Lun".len()..].trim_start();
        let (id, params) = match rest.split_once(char::is_whitespace) {
            Some((id, params)) => (id, params.trim()),
            None => (rest.trim_end(), ""),
        };

        if id.is_empty() {
            return Err(IetError::Parser(format!("LUN line without id: {:?}", line)));
        }
        let id: u32 = id
            .parse()
            .map_err(|_| IetError::Parser(format!("Invalid LUN id {:?} in {:?}", id, line)))?;

        if params.is_empty() {
            return Err(IetError::Parser(format!("Lun {} has no parameters", id)));
        }

        let mut parsed = Vec::new();
        for pair in params.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                IetError::Parser(format!("Lun {}: expected Key=Value, got {:?}", id, pair))
            })?;
            parsed.push((key.trim().to_lowercase(), value.trim().to_string()));
        }

        Ok(Some(Lun { id, params: parsed }))
    }

    /// Look up a parameter (case-insensitive key)
    pub fn param(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn path(&self) -> Option<&str> {
        self.param("path")
    }

    /// I/O type: `fileio`, `blockio` or `nullio`
    pub fn io_type(&self) -> Option<&str> {
        self.param("type")
    }
}

/// Parameters of a LUN to be added
///
/// Only the path is mandatory; the optional fields are written in a fixed
/// order when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LunSpec {
    path: String,
    io_type: Option<String>,
    scsi_id: Option<String>,
    scsi_sn: Option<String>,
    io_mode: Option<String>,
    block_size: Option<u32>,
}

impl LunSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// `fileio`, `blockio` or `nullio`
    pub fn io_type(mut self, io_type: impl Into<String>) -> Self {
        self.io_type = Some(io_type.into());
        self
    }

    pub fn scsi_id(mut self, scsi_id: impl Into<String>) -> Self {
        self.scsi_id = Some(scsi_id.into());
        self
    }

    pub fn scsi_sn(mut self, scsi_sn: impl Into<String>) -> Self {
        self.scsi_sn = Some(scsi_sn.into());
        self
    }

    /// `wb`, `ro` or `wt`
    pub fn io_mode(mut self, io_mode: impl Into<String>) -> Self {
        self.io_mode = Some(io_mode.into());
        self
    }

    pub fn block_size(mut self, block_size: u32) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Format as `Lun <id> Path=...[,Type=...]...`
    pub fn to_directive(&self, id: u32) -> IetResult<String> {
        let block_size = self.block_size.map(|b| b.to_string());
        let fields = [
            ("Path", Some(&self.path)),
            ("Type", self.io_type.as_ref()),
            ("ScsiId", self.scsi_id.as_ref()),
            ("ScsiSN", self.scsi_sn.as_ref()),
            ("IOMode", self.io_mode.as_ref()),
            ("BlockSize", block_size.as_ref()),
        ];

        let mut params = Vec::new();
        for (key, value) in fields {
            let Some(value) = value else { continue };
            if value.is_empty()
                || value.contains(&[',', '=', '#'][..])
                || value.chars().any(char::is_whitespace)
            {
                return Err(IetError::Invalid(format!(
                    "LUN {} value {:?} cannot be written to the config",
                    key, value
                )));
            }
            params.push(format!("{}={}", key, value));
        }

        Ok(format!("Lun {} {}", id, params.join(",")))
    }
}

/// Smallest non-negative id not in `used`
///
/// Freed ids are reused before the range is extended.
pub fn first_free_id(used: impl IntoIterator<Item = u32>) -> u32 {
    let used: BTreeSet<u32> = used.into_iter().collect();
    let mut candidate = 0;
    for id in used {
        if id != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lun() {
        let lun = Lun::parse("Lun 0 Path=/dev/sda,Type=blockio").unwrap().unwrap();
        assert_eq!(lun.id, 0);
        assert_eq!(lun.path(), Some("/dev/sda"));
        assert_eq!(lun.io_type(), Some("blockio"));
        assert_eq!(lun.param("TYPE"), Some("blockio"));
    }

    #[test]
    fn test_parse_lowercases_keys() {
        let lun = Lun::parse("\tLun 12 Path=/img,ScsiSN=ABC, IOMode=wb").unwrap().unwrap();
        assert_eq!(lun.id, 12);
        assert_eq!(
            lun.params,
            vec![
                ("path".to_string(), "/img".to_string()),
                ("scsisn".to_string(), "ABC".to_string()),
                ("iomode".to_string(), "wb".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_non_lun() {
        assert_eq!(Lun::parse("MaxConnections 1").unwrap(), None);
        assert_eq!(Lun::parse("Lunatic 1 Path=/x").unwrap(), None);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(Lun::parse("Lun"), Err(IetError::Parser(_))));
        assert!(matches!(Lun::parse("Lun x Path=/a"), Err(IetError::Parser(_))));
        assert!(matches!(Lun::parse("Lun 1"), Err(IetError::Parser(_))));
        assert!(matches!(Lun::parse("Lun 1 Path"), Err(IetError::Parser(_))));
    }

    #[test]
    fn test_lun_spec_field_order() {
        let spec = LunSpec::new("/dev/vg0/disk")
            .block_size(4096)
            .io_mode("wt")
            .io_type("blockio")
            .scsi_sn("SN1")
            .scsi_id("ID1");
        assert_eq!(
            spec.to_directive(3).unwrap(),
            "Lun 3 Path=/dev/vg0/disk,Type=blockio,ScsiId=ID1,ScsiSN=SN1,IOMode=wt,BlockSize=4096"
        );
        assert_eq!(LunSpec::new("/a").to_directive(0).unwrap(), "Lun 0 Path=/a");
    }

    #[test]
    fn test_lun_spec_rejects_separators() {
        assert!(LunSpec::new("/a,b").to_directive(0).is_err());
        assert!(LunSpec::new("/a").io_type("file io").to_directive(0).is_err());
        assert!(LunSpec::new("").to_directive(0).is_err());
    }

    #[test]
    fn test_first_free_id() {
        assert_eq!(first_free_id(Vec::new()), 0);
        assert_eq!(first_free_id([0, 1, 2]), 3);
        assert_eq!(first_free_id([0, 2]), 1);
        assert_eq!(first_free_id([2, 1]), 0);
        assert_eq!(first_free_id([3, 0, 1, 1]), 2);
    }
}
