// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::app::server::ServerConfig;
use crate::app::server::start_server;
use crate::cmd::config::print_prefs;
use crate::cmd::config::set_token;
use crate::cmd::deal::open_database;
use crate::cmd::deal::print_deck;
use crate::cmd::deal::print_genres;
use crate::error::Fallible;

const DEFAULT_DB: &str = "coupleswipe.db";

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Serve the swipe session in the browser.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Path to the settings database.
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
        /// Seed for the coin flip and the random pick.
        #[arg(long)]
        seed: Option<u64>,
        /// Don't open the browser.
        #[arg(long)]
        no_open: bool,
    },
    /// Build a deck with the saved preferences and print it as JSON.
    Deal {
        /// Number of titles, instead of the saved deck size.
        #[arg(long)]
        size: Option<usize>,
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
    },
    /// Print the TMDB genre list as JSON.
    Genres {
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
    },
    /// Save or forget the TMDB API read access token.
    Token {
        token: Option<String>,
        #[arg(long)]
        clear: bool,
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
    },
    /// Print the saved preferences, optionally importing them from TOML.
    Prefs {
        /// TOML file to import.
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Serve {
            port,
            db,
            seed,
            no_open,
        } => {
            let store = Arc::new(open_database(&db)?);
            let config = ServerConfig {
                port,
                open_browser: !no_open,
                seed,
                ..ServerConfig::default()
            };
            start_server(config, store).await
        }
        Command::Deal { size, db } => print_deck(&db, size).await,
        Command::Genres { db } => print_genres(&db).await,
        Command::Token { token, clear, db } => set_token(&db, token, clear),
        Command::Prefs { file, db } => print_prefs(&db, file.as_deref()),
    }
}
