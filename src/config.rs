// Copyright (c) 2026 ASM-Search Authors.
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

//! Command line configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::service::SessionConfig;
use crate::traversal::{TraversalOptions, UndecodablePolicy};

#[derive(Parser, Debug)]
#[command(
    name = "asmsearch",
    version,
    about = "Index every reachable instruction of a binary and search the disassembly"
)]
pub struct Args {
    /// Binary or dump to analyze
    #[arg(required_unless_present = "serve_engine")]
    pub binary: Option<PathBuf>,

    /// External engine program speaking the framed JSON engine protocol on stdio
    #[arg(long = "engine", value_name = "PROGRAM")]
    pub engine: Option<String>,

    /// Argument passed to the engine program (repeatable)
    #[arg(long = "engine-arg", value_name = "ARG", requires = "engine")]
    pub engine_args: Vec<String>,

    /// Command issued after opening the binary (repeatable)
    #[arg(long = "prepare", value_name = "COMMAND", default_values_t = [".reload -f".to_string(), "lm".to_string()])]
    pub prepare: Vec<String>,

    /// Command whose output lists the symbols used as starting points
    #[arg(long = "symbols-command", value_name = "COMMAND", default_value = "x *!*")]
    pub symbols_command: String,

    /// What to do with addresses the engine cannot decode
    #[arg(long = "on-undecodable", value_enum, default_value_t = OnUndecodable::Fail)]
    pub on_undecodable: OnUndecodable,

    /// Log progress every N explored addresses (0 disables)
    #[arg(long = "progress-interval", value_name = "N", default_value_t = 100)]
    pub progress_interval: usize,

    /// Ignore an existing cache and rebuild it
    #[arg(long = "rebuild", default_value_t = false)]
    pub rebuild: bool,

    /// Run the built-in engine as a protocol server on stdin/stdout
    #[arg(long = "serve-engine", default_value_t = false, conflicts_with_all = ["engine", "binary"])]
    pub serve_engine: bool,

    /// Enable debug output
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    pub debug: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnUndecodable {
    Fail,
    Skip,
}

impl From<OnUndecodable> for UndecodablePolicy {
    fn from(v: OnUndecodable) -> Self {
        match v {
            OnUndecodable::Fail => UndecodablePolicy::Fail,
            OnUndecodable::Skip => UndecodablePolicy::Skip,
        }
    }
}

impl Args {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            prepare_commands: self.prepare.clone(),
            symbols_command: self.symbols_command.clone(),
        }
    }

    pub fn traversal_options(&self) -> TraversalOptions {
        TraversalOptions {
            progress_interval: self.progress_interval,
            on_undecodable: self.on_undecodable.into(),
        }
    }

    pub fn log_spec(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_match_the_debugger_bootstrap() {
        let args = Args::try_parse_from(["asmsearch", "app.dll"]).unwrap();
        assert_eq!(args.binary, Some(PathBuf::from("app.dll")));
        let session = args.session_config();
        assert_eq!(session.prepare_commands, vec![".reload -f", "lm"]);
        assert_eq!(session.symbols_command, "x *!*");
        let options = args.traversal_options();
        assert_eq!(options.on_undecodable, UndecodablePolicy::Fail);
        assert_eq!(options.progress_interval, 100);
        assert_eq!(args.log_spec(), "info");
    }

    #[test]
    fn wrong_argument_count_is_a_usage_error() {
        assert!(Args::try_parse_from(["asmsearch"]).is_err());
        assert!(Args::try_parse_from(["asmsearch", "a.exe", "b.exe"]).is_err());
    }

    #[test]
    fn engine_and_policy_flags() {
        let args = Args::try_parse_from([
            "asmsearch",
            "--engine",
            "dbg-bridge",
            "--engine-arg",
            "--quiet",
            "--on-undecodable",
            "skip",
            "--prepare",
            ".load DbgModelApiXtn.dll",
            "--prepare",
            ".reload -f",
            "app.dll",
        ])
        .unwrap();
        assert_eq!(args.engine.as_deref(), Some("dbg-bridge"));
        assert_eq!(args.engine_args, vec!["--quiet"]);
        assert_eq!(args.traversal_options().on_undecodable, UndecodablePolicy::Skip);
        assert_eq!(
            args.session_config().prepare_commands,
            vec![".load DbgModelApiXtn.dll", ".reload -f"]
        );
    }

    #[test]
    fn serve_mode_needs_no_binary() {
        let args = Args::try_parse_from(["asmsearch", "--serve-engine"]).unwrap();
        assert!(args.serve_engine);
        assert!(args.binary.is_none());
    }
}
