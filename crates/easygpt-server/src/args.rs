use clap::Parser;
use std::path::PathBuf;

use crate::constants::BINARY_NAME;

pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:8501";

#[derive(Parser, Debug, Clone)]
#[command(author, version, long_about = None)]
#[command(about = "HTTP backend that turns LLM answers into cards")]
#[command(name = BINARY_NAME)]
pub struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "EASYGPT_BACKEND_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000, env = "EASYGPT_BACKEND_PORT")]
    pub port: u16,

    /// Origin of the frontend allowed by CORS
    #[arg(long, default_value = DEFAULT_FRONTEND_ORIGIN, env = "EASYGPT_FRONTEND_ORIGIN")]
    pub frontend_origin: String,

    /// Path of the TOML configuration file
    #[arg(short, long, default_value = "easygpt.toml", env = "EASYGPT_CONFIG")]
    pub config: PathBuf,
}

impl Args {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Origins the CORS layer accepts, in configuration order, without duplicates.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = Vec::new();
        for origin in [self.frontend_origin.as_str(), DEFAULT_FRONTEND_ORIGIN, "*"] {
            let origin = origin.trim();
            if !origin.is_empty() && !origins.iter().any(|o| o == origin) {
                origins.push(origin.to_string());
            }
        }
        origins
    }
}
