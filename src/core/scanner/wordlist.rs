// src/core/scanner/wordlist.rs

//! Static candidate tables for the active sources: the categorized
//! brute-force wordlist and the permutation building blocks.

use std::collections::{BTreeMap, HashSet};

/// Brute-force words grouped by the kind of service they usually name.
pub static CATEGORIES: &[(&str, &[&str])] = &[
    ("common", &[
        "www", "mail", "ftp", "admin", "test", "dev", "api", "blog", "shop", "forum",
        "news", "help", "support", "mobile", "m", "app", "apps", "secure", "portal",
        "dashboard", "panel", "control", "manage", "manager", "status", "health",
    ]),
    ("development", &[
        "dev", "test", "stage", "staging", "demo", "sandbox", "beta", "alpha", "qa",
        "uat", "prod", "production", "preview", "dev-api", "test-api", "staging-api",
        "dev-www", "test-www", "staging-www", "local", "localhost", "development",
    ]),
    ("infrastructure", &[
        "cdn", "static", "assets", "media", "images", "img", "js", "css", "files",
        "upload", "download", "backup", "archive", "storage", "s3", "ftp", "sftp",
        "git", "svn", "repo", "jenkins", "ci", "build", "deploy", "docker",
    ]),
    ("services", &[
        "api", "api1", "api2", "v1", "v2", "v3", "ws", "webservice", "service",
        "auth", "oauth", "sso", "login", "signin", "signup", "register", "account",
        "profile", "user", "users", "admin", "administrator", "root", "super",
    ]),
    ("communication", &[
        "mail", "email", "smtp", "pop", "pop3", "imap", "webmail", "mx", "mx1", "mx2",
        "chat", "irc", "xmpp", "sip", "voip", "conference", "meet", "zoom", "teams",
        "slack", "discord", "telegram", "whatsapp", "messenger", "support",
    ]),
    ("databases", &[
        "db", "database", "mysql", "postgres", "mongodb", "redis", "elastic", "es",
        "kibana", "grafana", "prometheus", "influx", "clickhouse", "cassandra",
        "neo4j", "couchdb", "rethinkdb", "memcached", "sql", "nosql",
    ]),
    ("monitoring", &[
        "monitor", "monitoring", "metrics", "logs", "logging", "analytics", "stats",
        "grafana", "prometheus", "nagios", "zabbix", "splunk", "elk", "kibana",
        "datadog", "newrelic", "sentry", "bugsnag", "rollbar", "pingdom",
    ]),
];

/// Labels placed in front of the target (`dev.example.com`).
pub static PERMUTATION_PREFIXES: &[&str] = &[
    "dev", "test", "stage", "staging", "prod", "production", "www", "api", "admin", "app",
    "mobile", "m",
];

/// Labels combined with every prefix, hyphenated and concatenated
/// (`dev-api.example.com`, `devapi.example.com`).
pub static PERMUTATION_SUFFIXES: &[&str] = &[
    "dev", "test", "stage", "staging", "prod", "production", "api", "admin", "backup", "old",
    "new",
];

/// Labels that get numbered variants `1..=10` (`www1.example.com`).
pub static NUMBERED_LABELS: &[&str] = &["www", "mail", "ftp"];

/// All categories flattened into one list, duplicates removed, first
/// occurrence order kept.
pub fn flattened() -> Vec<&'static str> {
    let mut seen = HashSet::new();
    CATEGORIES
        .iter()
        .flat_map(|(_, words)| words.iter().copied())
        .filter(|word| seen.insert(*word))
        .collect()
}

/// Size of each category, for the config view.
pub fn category_sizes() -> BTreeMap<&'static str, usize> {
    CATEGORIES
        .iter()
        .map(|(name, words)| (*name, words.len()))
        .collect()
}

/// Every permutation candidate for `domain`, in generation order, without
/// duplicates.
pub fn permutations(domain: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for prefix in PERMUTATION_PREFIXES {
        candidates.push(format!("{prefix}.{domain}"));
    }

    for prefix in PERMUTATION_PREFIXES {
        for suffix in PERMUTATION_SUFFIXES.iter().filter(|suffix| *suffix != prefix) {
            candidates.push(format!("{prefix}-{suffix}.{domain}"));
            candidates.push(format!("{prefix}{suffix}.{domain}"));
        }
    }

    for n in 1..=10 {
        for label in NUMBERED_LABELS {
            candidates.push(format!("{label}{n}.{domain}"));
        }
    }

    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}
