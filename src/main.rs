use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::Logger;

use asm_search::config::Args;
use asm_search::engine_client::EngineProcess;
use asm_search::local::LocalEngine;
use asm_search::request_handler::serve;
use asm_search::service::DisassemblerService;
use asm_search::transport::FramedTransport;
use asm_search::utils::absolute_path;
use asm_search::{index_binary, run_query_loop};

fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries search results or protocol frames, so logs go to stderr
    let _logger = Logger::try_with_env_or_str(args.log_spec())?
        .log_to_stderr()
        .start()
        .context("Failed to start logger")?;

    if args.serve_engine {
        let mut transport = FramedTransport::stdio();
        let mut engine = LocalEngine::new();
        let handled = serve(&mut transport, &mut engine)?;
        log::debug!("Served {} engine requests", handled);
        return Ok(());
    }

    let Some(binary) = args.binary.as_deref() else {
        anyhow::bail!("A binary to analyze is required");
    };
    let binary = absolute_path(binary);
    log::debug!("Analyzing {}", binary.display());

    let index = index_binary(
        &binary,
        args.rebuild,
        &args.session_config(),
        &args.traversal_options(),
        || -> Result<Box<dyn DisassemblerService>> {
            match &args.engine {
                Some(program) => {
                    log::info!("Starting engine {}", program);
                    let process = EngineProcess::spawn(program, &args.engine_args)
                        .with_context(|| format!("Failed to start engine '{}'", program))?;
                    Ok(Box::new(process))
                }
                None => Ok(Box::new(LocalEngine::new())),
            }
        },
    )?;
    log::info!("{} instructions indexed", index.len());

    let stdin = io::stdin();
    let stdout = io::stdout();
    run_query_loop(&index, stdin.lock(), stdout.lock()).context("Search loop failed")?;
    Ok(())
}
