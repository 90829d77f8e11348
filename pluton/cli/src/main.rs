#![warn(clippy::indexing_slicing)]
#![deny(unused_crate_dependencies)]

//! `pluton`: renders the containers the injector adds to a pod, without a cluster round trip
//! except for `pluton mesh`.

use clap::Parser;
use pluton_inject::template::version_hash;

use crate::{
    config::{Cli, Commands, TemplateHashArgs},
    error::{CliError, CliResult},
};

mod config;
mod error;
mod input;
mod logging;
mod mesh;
mod render;

fn template_hash(args: TemplateHashArgs) -> CliResult<()> {
    let template = input::read_input(&args.template)?;

    println!("{}", version_hash(&template));

    Ok(())
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    logging::init_tracing_registry(cli.json_log);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::RuntimeError)?;

    let res: CliResult<()> = rt.block_on(async move {
        match cli.commands {
            Commands::Render(args) => render::render(*args)?,
            Commands::TemplateHash(args) => template_hash(args)?,
            Commands::Mesh(args) => mesh::mesh(*args).await?,
        }

        Ok(())
    });

    res.map_err(Into::into)
}
