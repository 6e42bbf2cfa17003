// config.rs - configuration
//
// minimal-irc-server - minimal IRC server
// Copyright (C) 2025  Leon Zipp
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use clap;
use serde_derive::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::net::IpAddr;
use toml;
use validator::Validate;

#[derive(clap::Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[clap(help = "Listen port")]
    port: Option<u16>,
    #[clap(help = "Connection password")]
    password: Option<String>,
    #[clap(short, long, help = "Configuration file path")]
    config: Option<String>,
    #[clap(short, long, help = "Listen bind address")]
    listen: Option<IpAddr>,
    #[clap(short = 'n', long, help = "Server name")]
    name: Option<String>,
}

/// Main configuration structure.
#[derive(PartialEq, Eq, Serialize, Deserialize, Debug, Clone, Validate)]
pub(crate) struct MainConfig {
    #[validate(contains = ".")]
    pub(crate) name: String,
    pub(crate) listen: IpAddr,
    pub(crate) port: u16,
    #[validate(length(min = 1))]
    pub(crate) password: String,
    pub(crate) max_connections: Option<usize>,
}

impl MainConfig {
    pub(crate) fn new(cli: Cli) -> Result<MainConfig, Box<dyn Error>> {
        let mut config = if let Some(config_path) = cli.config.as_deref() {
            let mut config_file = File::open(config_path)?;
            let mut config_str = String::new();
            config_file.read_to_string(&mut config_str)?;
            toml::from_str::<MainConfig>(&config_str)?
        } else {
            MainConfig::default()
        };
        // modify configuration by CLI options
        if let Some(addr) = cli.listen {
            config.listen = addr;
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(name) = cli.name {
            config.name = name;
        }
        if let Some(password) = cli.password {
            config.password = password;
        }
        if config.password.is_empty() {
            return Err(Box::new(clap::error::Error::raw(
                clap::ErrorKind::ValueValidation,
                "Connection password is required",
            )));
        }
        if let Err(e) = config.validate() {
            Err(Box::new(e))
        } else {
            Ok(config)
        }
    }
}

impl Default for MainConfig {
    fn default() -> Self {
        MainConfig {
            name: "irc.localhost".to_string(),
            listen: "127.0.0.1".parse().unwrap(),
            port: 6667,
            password: String::new(),
            max_connections: None,
        }
    }
}
