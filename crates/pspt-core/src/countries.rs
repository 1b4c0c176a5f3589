use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pricing::NewCountry;
use crate::ConfigError;

/// One entry of the seed countries file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountrySeed {
    pub name: String,
    pub iso_code: String,
    pub region_identifier: String,
    pub source_url: Option<String>,
}

impl CountrySeed {
    #[must_use]
    pub fn to_new_country(&self) -> NewCountry {
        NewCountry {
            name: self.name.trim().to_string(),
            iso_code: self.iso_code.trim().to_ascii_uppercase(),
            region_identifier: self.region_identifier.trim().to_ascii_lowercase(),
            source_url: self
                .source_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CountriesFile {
    pub countries: Vec<CountrySeed>,
}

impl CountriesFile {
    #[must_use]
    pub fn to_new_countries(&self) -> Vec<NewCountry> {
        self.countries.iter().map(CountrySeed::to_new_country).collect()
    }
}

/// Load and validate the seed countries from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_countries(path: &Path) -> Result<CountriesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CountriesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let countries_file: CountriesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::CountriesFileParse)?;

    validate_countries(&countries_file)?;

    Ok(countries_file)
}

fn validate_countries(countries_file: &CountriesFile) -> Result<(), ConfigError> {
    let mut seen_iso = HashSet::new();

    for country in &countries_file.countries {
        if country.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "country name must be non-empty".to_string(),
            ));
        }

        let iso = country.iso_code.trim().to_ascii_uppercase();
        if iso.len() != 2 || !iso.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Validation(format!(
                "country '{}' has invalid ISO code '{}'; must be 2 letters",
                country.name, country.iso_code
            )));
        }

        if country.region_identifier.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "country '{}' has an empty region identifier",
                country.name
            )));
        }

        if !seen_iso.insert(iso.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate ISO code: '{iso}' (from country '{}')",
                country.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(name: &str, iso: &str, region: &str) -> CountrySeed {
        CountrySeed {
            name: name.to_string(),
            iso_code: iso.to_string(),
            region_identifier: region.to_string(),
            source_url: None,
        }
    }

    #[test]
    fn to_new_country_normalizes_case_and_blank_url() {
        let mut s = seed(" Germany ", "de", "DE-DE");
        s.source_url = Some("  ".to_string());
        let country = s.to_new_country();
        assert_eq!(country.name, "Germany");
        assert_eq!(country.iso_code, "DE");
        assert_eq!(country.region_identifier, "de-de");
        assert_eq!(country.source_url, None);
    }

    #[test]
    fn validate_rejects_three_letter_iso() {
        let file = CountriesFile {
            countries: vec![seed("United States", "USA", "en-us")],
        };
        let err = validate_countries(&file).unwrap_err();
        assert!(err.to_string().contains("invalid ISO code"));
    }

    #[test]
    fn validate_rejects_empty_name() {
        let file = CountriesFile {
            countries: vec![seed("  ", "US", "en-us")],
        };
        let err = validate_countries(&file).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_duplicate_iso_case_insensitively() {
        let file = CountriesFile {
            countries: vec![
                seed("United States", "US", "en-us"),
                seed("USA again", "us", "es-us"),
            ],
        };
        let err = validate_countries(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate ISO code"));
    }

    #[test]
    fn validate_rejects_empty_region() {
        let file = CountriesFile {
            countries: vec![seed("Japan", "JP", "")],
        };
        assert!(validate_countries(&file).is_err());
    }

    #[test]
    fn load_countries_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/countries.yaml");
        let file = load_countries(&path).expect("seed countries file should load");
        assert_eq!(file.countries.len(), 10);
        assert!(file
            .countries
            .iter()
            .any(|c| c.iso_code == "JP" && c.region_identifier == "ja-jp"));
    }

    #[test]
    fn load_countries_reports_missing_file() {
        let err = load_countries(Path::new("/nonexistent/countries.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::CountriesFileIo { .. }));
    }
}
