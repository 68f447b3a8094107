use std::path::PathBuf;

use crate::{Credential, Environment};

const STORAGE_PATH: &str = "MONITOR_STORAGE_PATH";

const DEFAULT_STORAGE_PATH: &str = "./storage";

pub fn get_storage_path() -> PathBuf {
    let path_from_env = std::env::var(STORAGE_PATH);
    path_from_env.map_or(PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from)
}

const PROD_USERNAME: &str = "PROD_MGMT_USERNAME";
const PROD_PASSWORD: &str = "PROD_MGMT_PASSWORD";
const NONPROD_USERNAME: &str = "NONPROD_MGMT_USERNAME";
const NONPROD_PASSWORD: &str = "NONPROD_MGMT_PASSWORD";

/// Management credentials from the environment, used when no credentials file
/// is present for the environment.
pub fn get_env_credentials(environment: Environment) -> Option<Credential> {
    let (user_var, pass_var) = match environment {
        Environment::Production => (PROD_USERNAME, PROD_PASSWORD),
        Environment::NonProduction => (NONPROD_USERNAME, NONPROD_PASSWORD),
    };

    let username = std::env::var(user_var).ok()?;
    let password = std::env::var(pass_var).ok()?;
    Some(Credential { username, password })
}
