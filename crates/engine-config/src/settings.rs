use crate::{env::EnvManager, error::ConfigError};
use std::{path::PathBuf, str::FromStr};
use tracing::debug;

pub const DEFAULT_OUTPUT_DIR: &str = "./output";
pub const WATERMARK_FILE_NAME: &str = "extraction-date.json";

/// Every key the pipeline reads, used when logging the effective configuration.
pub const KNOWN_KEYS: &[&str] = &[
    "PROD_MONGO_URI",
    "QA_MONGO_URI",
    "PROD_PG_URL",
    "QA_PG_URL",
    "PROD_R2_ENDPOINT",
    "PROD_R2_REGION",
    "PROD_R2_ACCESS_KEY_ID",
    "PROD_R2_SECRET_ACCESS_KEY",
    "PROD_R2_BUCKET",
    "QA_R2_ENDPOINT",
    "QA_R2_REGION",
    "QA_R2_ACCESS_KEY_ID",
    "QA_R2_SECRET_ACCESS_KEY",
    "QA_R2_BUCKET",
    "MONGO_COLLECTION_NAMES",
    "PG_TABLE_NAMES",
    "PRESERVE_FIELDS",
    "OUTPUT_DIR",
    "WATERMARK_FILE",
    "MONGO_EXTRACT_BATCH_SIZE",
    "PG_EXTRACT_BATCH_SIZE",
    "MONGO_LOAD_BATCH_SIZE",
    "PG_LOAD_BATCH_SIZE",
    "ASSET_PAGE_SIZE",
    "TRANSFORM_CONCURRENCY",
    "CONNECT_MAX_ATTEMPTS",
    "CLEANUP_INTERMEDIATE",
];

#[derive(Debug, Clone)]
pub struct MongoSettings {
    pub source_uri: String,
    pub destination_uri: String,
    /// Collections to extract; empty means all.
    pub collections: Vec<String>,
    pub extract_batch_size: usize,
    pub load_batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct PgSettings {
    pub source_url: String,
    pub destination_url: String,
    /// Tables to extract; empty means all.
    pub tables: Vec<String>,
    pub extract_batch_size: usize,
    pub load_batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct BucketSettings {
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub source: BucketSettings,
    pub destination: BucketSettings,
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub output_dir: PathBuf,
    pub watermark_file: PathBuf,
    /// Extra field names never anonymized (exact match).
    pub preserve_fields: Vec<String>,
    pub transform_concurrency: usize,
    pub connect_max_attempts: usize,
    pub cleanup_intermediate: bool,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongo: MongoSettings,
    pub pg: PgSettings,
    /// `None` when no source bucket is configured; the asset phase is then skipped.
    pub assets: Option<AssetSettings>,
    pub pipeline: PipelineSettings,
}

impl Settings {
    pub fn from_env(env: &EnvManager) -> Result<Self, ConfigError> {
        let mongo = MongoSettings {
            source_uri: env.require("PROD_MONGO_URI")?.to_string(),
            destination_uri: env.require("QA_MONGO_URI")?.to_string(),
            collections: parse_list(env.get("MONGO_COLLECTION_NAMES")),
            extract_batch_size: parse_positive(env, "MONGO_EXTRACT_BATCH_SIZE", 1000)?,
            load_batch_size: parse_positive(env, "MONGO_LOAD_BATCH_SIZE", 1000)?,
        };

        let pg = PgSettings {
            source_url: pg_url(env, "PROD")?,
            destination_url: pg_url(env, "QA")?,
            tables: parse_list(env.get("PG_TABLE_NAMES")),
            extract_batch_size: parse_positive(env, "PG_EXTRACT_BATCH_SIZE", 10_000)?,
            load_batch_size: parse_positive(env, "PG_LOAD_BATCH_SIZE", 5000)?,
        };

        let assets = match env.get("PROD_R2_BUCKET") {
            Some(_) => Some(AssetSettings {
                source: bucket(env, "PROD")?,
                destination: bucket(env, "QA")?,
                page_size: parse_positive(env, "ASSET_PAGE_SIZE", 1000)?,
            }),
            None => None,
        };

        let pipeline = PipelineSettings::from_env(env)?;

        Ok(Settings {
            mongo,
            pg,
            assets,
            pipeline,
        })
    }
}

impl PipelineSettings {
    /// Only the pipeline keys; usable without any store configured.
    pub fn from_env(env: &EnvManager) -> Result<Self, ConfigError> {
        let output_dir = PathBuf::from(env.get("OUTPUT_DIR").unwrap_or(DEFAULT_OUTPUT_DIR));
        let watermark_file = env
            .get("WATERMARK_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| output_dir.join(WATERMARK_FILE_NAME));

        Ok(PipelineSettings {
            watermark_file,
            output_dir,
            preserve_fields: parse_list(env.get("PRESERVE_FIELDS")),
            transform_concurrency: parse_positive(env, "TRANSFORM_CONCURRENCY", 4)?,
            connect_max_attempts: parse_positive(env, "CONNECT_MAX_ATTEMPTS", 3)?,
            cleanup_intermediate: parse_bool(env, "CLEANUP_INTERMEDIATE", true)?,
        })
    }
}

/// Logs every configured key with secrets masked.
pub fn log_effective(env: &EnvManager) {
    for key in KNOWN_KEYS {
        if let Some(value) = env.masked(key) {
            debug!(key, %value, "Configuration");
        }
    }
}

fn parse_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_positive(env: &EnvManager, key: &str, default: usize) -> Result<usize, ConfigError> {
    let Some(raw) = env.get(key) else {
        return Ok(default);
    };

    match usize::from_str(raw) {
        Ok(0) => Err(ConfigError::invalid(key, "must be greater than zero")),
        Ok(value) => Ok(value),
        Err(err) => Err(ConfigError::invalid(key, format!("'{raw}' is not a number ({err})"))),
    }
}

fn parse_bool(env: &EnvManager, key: &str, default: bool) -> Result<bool, ConfigError> {
    match env.get(key).map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::invalid(key, format!("'{other}' is not a boolean"))),
    }
}

/// `<PREFIX>_PG_URL`, or a key/value connection string assembled from its parts.
fn pg_url(env: &EnvManager, prefix: &str) -> Result<String, ConfigError> {
    if let Some(url) = env.get(&format!("{prefix}_PG_URL")) {
        return Ok(url.to_string());
    }

    let part = |name: &str| env.require(&format!("{prefix}_PG_{name}"));
    let host = part("HOST")?;
    let port = env.get(&format!("{prefix}_PG_PORT")).unwrap_or("5432");
    let dbname = part("DB")?;
    let user = part("USER")?;
    let password = env.get(&format!("{prefix}_PG_PASS")).unwrap_or_default();
    let sslmode = env.get(&format!("{prefix}_PG_SSLMODE")).unwrap_or("prefer");

    if u16::from_str(port).is_err() {
        return Err(ConfigError::invalid(&format!("{prefix}_PG_PORT"), format!("'{port}' is not a port")));
    }

    Ok(format!(
        "host={} port={port} dbname={} user={} password={} sslmode={}",
        quote_conninfo(host),
        quote_conninfo(dbname),
        quote_conninfo(user),
        quote_conninfo(password),
        quote_conninfo(sslmode),
    ))
}

fn quote_conninfo(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn bucket(env: &EnvManager, prefix: &str) -> Result<BucketSettings, ConfigError> {
    let key = |name: &str| format!("{prefix}_R2_{name}");
    Ok(BucketSettings {
        endpoint: env.require(&key("ENDPOINT"))?.to_string(),
        region: env.get(&key("REGION")).unwrap_or("auto").to_string(),
        access_key_id: env.require(&key("ACCESS_KEY_ID"))?.to_string(),
        secret_access_key: env.require(&key("SECRET_ACCESS_KEY"))?.to_string(),
        bucket: env.require(&key("BUCKET"))?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("PROD_MONGO_URI", "mongodb://localhost/prod"),
            ("QA_MONGO_URI", "mongodb://localhost/qa"),
            ("PROD_PG_URL", "postgres://u:p@localhost/prod"),
            ("QA_PG_URL", "postgres://u:p@localhost/qa"),
        ]
    }

    fn with(extra: &[(&'static str, &'static str)]) -> EnvManager {
        let mut vars = base();
        vars.extend_from_slice(extra);
        EnvManager::from_vars(vars)
    }

    #[test]
    fn applies_defaults() {
        let settings = Settings::from_env(&with(&[])).unwrap();
        assert_eq!(settings.mongo.extract_batch_size, 1000);
        assert_eq!(settings.pg.extract_batch_size, 10_000);
        assert_eq!(settings.pg.load_batch_size, 5000);
        assert_eq!(settings.pipeline.transform_concurrency, 4);
        assert_eq!(settings.pipeline.connect_max_attempts, 3);
        assert!(settings.pipeline.cleanup_intermediate);
        assert!(settings.assets.is_none());
        assert_eq!(
            settings.pipeline.watermark_file,
            PathBuf::from("./output").join("extraction-date.json")
        );
    }

    #[test]
    fn missing_required_key_is_named() {
        let env = EnvManager::from_vars(base().into_iter().filter(|(k, _)| *k != "QA_MONGO_URI"));
        let err = Settings::from_env(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(key) if key == "QA_MONGO_URI"));
    }

    #[test]
    fn rejects_invalid_numbers() {
        let err = Settings::from_env(&with(&[("PG_LOAD_BATCH_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "PG_LOAD_BATCH_SIZE"));

        let err = Settings::from_env(&with(&[("TRANSFORM_CONCURRENCY", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "TRANSFORM_CONCURRENCY"));
    }

    #[test]
    fn parses_allow_lists() {
        let settings = Settings::from_env(&with(&[
            ("MONGO_COLLECTION_NAMES", "users, orders,,"),
            ("PRESERVE_FIELDS", "tenantId"),
            ("CLEANUP_INTERMEDIATE", "false"),
        ]))
        .unwrap();
        assert_eq!(settings.mongo.collections, vec!["users", "orders"]);
        assert!(settings.pg.tables.is_empty());
        assert_eq!(settings.pipeline.preserve_fields, vec!["tenantId"]);
        assert!(!settings.pipeline.cleanup_intermediate);
    }

    #[test]
    fn builds_pg_conninfo_from_parts() {
        let env = EnvManager::from_vars([
            ("PROD_MONGO_URI", "mongodb://localhost/prod"),
            ("QA_MONGO_URI", "mongodb://localhost/qa"),
            ("QA_PG_URL", "postgres://u:p@localhost/qa"),
            ("PROD_PG_HOST", "db.internal"),
            ("PROD_PG_DB", "main"),
            ("PROD_PG_USER", "app"),
            ("PROD_PG_PASS", "it's"),
            ("PROD_PG_SSLMODE", "require"),
        ]);

        let settings = Settings::from_env(&env).unwrap();
        assert_eq!(
            settings.pg.source_url,
            "host='db.internal' port=5432 dbname='main' user='app' password='it\\'s' sslmode='require'"
        );
    }

    #[test]
    fn reads_bucket_pairs() {
        let settings = Settings::from_env(&with(&[
            ("PROD_R2_ENDPOINT", "https://prod.example"),
            ("PROD_R2_ACCESS_KEY_ID", "a"),
            ("PROD_R2_SECRET_ACCESS_KEY", "b"),
            ("PROD_R2_BUCKET", "assets"),
            ("QA_R2_ENDPOINT", "https://qa.example"),
            ("QA_R2_REGION", "eu-west-1"),
            ("QA_R2_ACCESS_KEY_ID", "c"),
            ("QA_R2_SECRET_ACCESS_KEY", "d"),
            ("QA_R2_BUCKET", "assets-qa"),
        ]))
        .unwrap();

        let assets = settings.assets.unwrap();
        assert_eq!(assets.source.region, "auto");
        assert_eq!(assets.destination.region, "eu-west-1");
        assert_eq!(assets.destination.bucket, "assets-qa");
        assert_eq!(assets.page_size, 1000);
    }
}
