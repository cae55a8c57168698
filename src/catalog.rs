// catalog.rs - Built-in Path Catalogs
// Purpose: Object key prefixes and sensitive filenames probed in every bucket

use crate::targets::read_lines;
use colored::*;
use std::path::Path;
use tracing::warn;

/// Key prefixes, probed in this order
pub const PREFIXES: &[&str] = &[
    "", "v1/", "v2/", "backup/", "config/", "staging/", "env/", "old/", "builds/",
    "test/", "deploy/", "aws/", "conf/", "db/", "tmp/",
    "exports/", "db_dumps/", "financial/", "private/", "ssl/", "keys/", "users/",
    "customers/", "secure/", "archive/", "logs/",
];

/// Default filename payloads
pub const PAYLOADS: &[&str] = &[
    // Secrets
    ".env", ".env.local", ".env.prod", ".env.staging", ".env.bak",
    "secrets.json", "secrets.yaml", "credentials.json", "credentials",
    ".aws/credentials", ".passwd", "id_rsa", "id_rsa.pub", "master.key",
    "token.txt", "access_token", "auth.json", "service-account.json",

    // Configs
    "config.json", "config.php", "config.js", "web.config", "settings.py",
    "local_settings.py", "application.yml", "bootstrap.yml", "firebase.json",
    "parameters.yml", "connections.xml", "db.conf.php", "docker-compose.yml",

    // Backups
    "backup.sql", "db.sql", "dump.sql", "database.sql", "db_backup.sql",
    "backup.tar.gz", "backup.zip", "full_backup.sql", "mysql.sql",
    "data.sql", "migrate.sql", "dump.gz", "prod.bak", "db.sqlite",

    // Dev tooling
    "package-lock.json", ".npmrc", ".yarnrc", "composer.json", "Gemfile.lock",
    ".gitignore", ".git/config", "terraform.tfstate", "terraform.tfvars",
    ".travis.yml", ".gitlab-ci.yml", "jenkins.xml", "circle.yml",

    // Logs and debug pages
    "phpinfo.php", "info.php", "debug.log", "error.log", "access.log",

    // Keys and customer data
    "server.key", "api_keys.json", "customer_data.csv", "database.sqlite",
    "auth_token.txt", "client_secrets.json", "keystore.jks", "backup.rar",
    "shadow", "passwd", "id_dsa",

    // API specs, nested configs, cluster credentials
    "swagger.json", "swagger.yaml", "openapi.json", "graphql/schema.json",
    "admin/config.php", "admin/.env", "backup/database.sql", "db/prod.sqlite",
    "jenkins/secrets/master.key", "k8s/kubeconfig", "kubeconfig", ".kube/config",
    "id_rsa_deploy", "deployment-key.json", "service-account-key.json",
    "storage.json", "aws-creds.json", "s3-config.json",
];

pub fn default_payloads() -> Vec<String> {
    PAYLOADS.iter().map(|p| p.to_string()).collect()
}

/// Resolve the payload list: a custom wordlist when given and readable,
/// otherwise the built-in catalog. A bad wordlist never aborts the run.
pub fn load_payloads(wordlist: Option<&Path>) -> Vec<String> {
    let Some(path) = wordlist else {
        return default_payloads();
    };

    match read_lines(path) {
        Ok(lines) if !lines.is_empty() => lines,
        Ok(_) => {
            warn!(path = %path.display(), "wordlist is empty, using default payloads");
            eprintln!("{}", format!("⚠️ Wordlist {} is empty. Using default payloads.", path.display()).yellow());
            default_payloads()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load wordlist, using default payloads");
            eprintln!("{}", format!("⚠️ Failed to load wordlist: {:#}. Using default payloads.", e).yellow());
            default_payloads()
        }
    }
}
