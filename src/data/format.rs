use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// How an upload's bytes are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    Csv,
    Json,
    /// `application/vnd.ms-excel`: what several browsers report for `.csv`
    /// files. Decoded as delimited text.
    Excel,
}

impl DataFormat {
    /// Picks a format from the declared media type, falling back to a
    /// `.csv` file name suffix.
    pub fn detect(name: &str, media_type: &str) -> Result<DataFormat> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/csv" => return Ok(DataFormat::Csv),
            "application/json" => return Ok(DataFormat::Json),
            "application/vnd.ms-excel" => return Ok(DataFormat::Excel),
            _ => {}
        }
        if name.to_ascii_lowercase().ends_with(".csv") {
            return Ok(DataFormat::Csv);
        }
        Err(Error::UnsupportedFormat {
            name: name.to_owned(),
            media_type: media_type.to_owned(),
        })
    }

    pub fn is_delimited(&self) -> bool {
        matches!(self, DataFormat::Csv | DataFormat::Excel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_wins() {
        assert_eq!(DataFormat::detect("x.bin", "text/csv").unwrap(), DataFormat::Csv);
        assert_eq!(DataFormat::detect("x", "Application/JSON; charset=utf-8").unwrap(), DataFormat::Json);
        assert_eq!(DataFormat::detect("x.xls", "application/vnd.ms-excel").unwrap(), DataFormat::Excel);
    }

    #[test]
    fn csv_suffix_is_a_fallback() {
        assert_eq!(DataFormat::detect("data.CSV", "").unwrap(), DataFormat::Csv);
        assert_eq!(DataFormat::detect("data.csv", "application/octet-stream").unwrap(), DataFormat::Csv);
    }

    #[test]
    fn text_files_are_rejected() {
        let err = DataFormat::detect("notes.txt", "text/plain").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }
}
