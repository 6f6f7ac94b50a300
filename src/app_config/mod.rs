use config::{Config, Environment, File, FileFormat};

use crate::auth::DEFAULT_IDENTITY_HEADER;

#[derive(Debug, serde::Deserialize, Clone)]
pub struct Conf {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub db_url: String,
    #[serde(default)]
    pub db_dc: String,
    #[serde(default)]
    pub schema_file: String,
    #[serde(default)]
    pub use_scylla: bool,
    pub fixture_file: Option<String>,
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
}

fn default_identity_header() -> String {
    DEFAULT_IDENTITY_HEADER.to_string()
}

pub struct AppConfig {
    conf: Config,
}

impl AppConfig {
    pub fn init() -> Self {
        Self {
            conf: Config::new(),
        }
    }
    pub fn from_env(mut self) -> Self {
        dotenv::dotenv().ok();
        if let Err(e) = self.conf.merge(Environment::new()) {
            panic!("Failed to load env: {:?}", e)
        }
        self
    }
    #[allow(dead_code)]
    pub fn from_file(mut self, filename: &str, file_format: FileFormat) -> Self {
        if let Err(e) = self.conf.merge(File::new(filename, file_format)) {
            panic!("Failed to load file {:?}: {:?}", filename, e);
        }
        self
    }
    /// Like [`AppConfig::from_file`], but a missing file is skipped.
    pub fn from_optional_file(mut self, filename: &str, file_format: FileFormat) -> Self {
        if let Err(e) = self
            .conf
            .merge(File::new(filename, file_format).required(false))
        {
            panic!("Failed to load file {:?}: {:?}", filename, e);
        }
        self
    }
    pub fn parse(self) -> Conf {
        match self.conf.try_into() {
            Ok(conf) => conf,
            Err(e) => {
                panic!("Failed to construct config: {:?}", e)
            }
        }
    }
}
