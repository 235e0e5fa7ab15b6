//! Rendered files: per-CA openssl config, nginx vhost, cron entry

use crate::utils::CrlError;
use minijinja::{context, Environment};
use std::path::Path;

const OPENSSL_CNF_TEMPLATE: &str = r#"# Generated by pki-ops for {{ name }}
[ ca ]
default_ca = crl_ca

[ crl_ca ]
database = {{ database }}
crlnumber = {{ crlnumber }}
default_md = sha256
default_crl_days = {{ crl_days }}
"#;

const NGINX_TEMPLATE: &str = r#"# Generated by pki-ops; re-run `pki-ops crl --nginx` to regenerate.
server {
    listen 80;
    listen [::]:80;
    server_name {{ domain }};

    root {{ root }};
    autoindex off;

    location ~ \.crl$ {
        default_type application/pkix-crl;
        add_header Cache-Control "public, max-age={{ max_age }}";
        try_files $uri =404;
    }

    location ~ \.crl\.pem$ {
        default_type application/x-pem-file;
        add_header Cache-Control "public, max-age={{ max_age }}";
        try_files $uri =404;
    }

    location / {
        return 404;
    }
}
"#;

const CRON_TEMPLATE: &str = r#"# Regenerates CRLs for {{ ca_dir }} (installed by pki-ops)
SHELL=/bin/sh
PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin
{{ schedule }} root {{ command }} >> {{ log }} 2>&1
"#;

/// Seconds clients may cache a published CRL
const CRL_MAX_AGE_SECS: u32 = 3600;

fn environment() -> Result<Environment<'static>, CrlError> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    for (name, source) in [
        ("openssl.cnf", OPENSSL_CNF_TEMPLATE),
        ("nginx.conf", NGINX_TEMPLATE),
        ("cron", CRON_TEMPLATE),
    ] {
        env.add_template(name, source)
            .map_err(|e| CrlError::Template {
                message: e.to_string(),
            })?;
    }
    Ok(env)
}

fn render(name: &str, ctx: minijinja::Value) -> Result<String, CrlError> {
    let env = environment()?;
    let template = env.get_template(name).map_err(|e| CrlError::Template {
        message: e.to_string(),
    })?;
    template.render(ctx).map_err(|e| CrlError::Template {
        message: e.to_string(),
    })
}

/// Minimal `openssl ca` config pointing at a CA's database files
pub fn render_openssl_config(
    name: &str,
    state_dir: &Path,
    crl_days: u32,
) -> Result<String, CrlError> {
    render(
        "openssl.cnf",
        context! {
            name => name,
            database => state_dir.join("index.txt").display().to_string(),
            crlnumber => state_dir.join("crlnumber").display().to_string(),
            crl_days => crl_days,
        },
    )
}

/// nginx server block publishing CRLs from `root`
pub fn render_nginx_vhost(domain: &str, root: &Path) -> Result<String, CrlError> {
    render(
        "nginx.conf",
        context! {
            domain => domain,
            root => root.display().to_string(),
            max_age => CRL_MAX_AGE_SECS,
        },
    )
}

/// `/etc/cron.d` entry re-running the CRL generation
pub fn render_cron_entry(
    schedule: &str,
    executable: &Path,
    ca_dir: &Path,
    output_dir: &Path,
    crl_days: u32,
    log: &Path,
) -> Result<String, CrlError> {
    let command = [
        shell_quote(&executable.display().to_string()),
        "crl".to_string(),
        "--ca-dir".to_string(),
        shell_quote(&ca_dir.display().to_string()),
        "--output-dir".to_string(),
        shell_quote(&output_dir.display().to_string()),
        "--crl-days".to_string(),
        crl_days.to_string(),
    ]
    .join(" ");

    render(
        "cron",
        context! {
            ca_dir => ca_dir.display().to_string(),
            schedule => schedule,
            command => command,
            log => shell_quote(&log.display().to_string()),
        },
    )
}

/// Single-quote `value` for `/bin/sh` when it contains anything unusual
fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-:=+@%,".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
