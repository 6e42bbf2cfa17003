// main.rs - main program
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

use std::process::exit;

use clap::Parser;
use tracing::*;
use tracing_subscriber::EnvFilter;

mod command;
mod config;
mod reply;
mod state;
mod utils;

use config::{Cli, MainConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match MainConfig::new(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };

    match state::run_server(config).await {
        Ok((main_state, handle, _)) => {
            {
                let main_state = main_state.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("Interrupted, shutting down");
                        main_state.shutdown();
                    }
                });
            }
            if let Err(e) = handle.await {
                error!("Server task failed: {}", e);
            }
        }
        Err(e) => {
            error!("Failed to start server: {}", e);
            exit(1);
        }
    }
}
