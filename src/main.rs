//! A dynamic tiling X11 window manager built around tags and input modes

#![deny(
    clippy::all,
    clippy::complexity,
    clippy::correctness,
    clippy::perf,
    clippy::style,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    ellipsis_inclusive_range_patterns,
    macro_use_extern_crate,
    missing_abi,
    no_mangle_generic_items,
    non_shorthand_field_patterns,
    noop_method_call,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    semicolon_in_expressions_from_macros,
    unconditional_recursion,
    while_true
)]
#![allow(
    clippy::redundant_pub_crate,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::struct_excessive_bools,
    clippy::missing_errors_doc,
    clippy::upper_case_acronyms,
    clippy::use_self
)]
#![cfg_attr(
    any(test),
    allow(
        clippy::expect_fun_call,
        clippy::expect_used,
        clippy::panic,
        clippy::unwrap_used,
        clippy::wildcard_enum_match_arm,
    )
)]

mod cli;
mod config;
mod core;
mod error;
mod geometry;
mod macros;
mod manager;
mod monitor;
mod process;
mod rule;
mod statusbar;
mod utils;
mod x;

use anyhow::Result;
use clap::Parser;
use cli::Opts;
use colored::Colorize;
use config::Config;
use manager::WindowManager;
use x::xconnection::XConnection;

fn main() {
    if let Err(e) = run() {
        tagwm_fatal!("{:#}", e);
    }
}

fn run() -> Result<()> {
    let opts = Opts::parse();

    match opts.color_when.as_deref() {
        Some("never") => colored::control::set_override(false),
        Some("always") => colored::control::set_override(true),
        _ => {},
    }

    let config = match &opts.config {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => tagwm_fatal!("{:#}", e),
    };

    if opts.check {
        return match config.settings() {
            Ok(_) => {
                tagwm_info!("{}", "configuration is valid".green());
                Ok(())
            },
            Err(e) => tagwm_fatal!("{:#}", e),
        };
    }

    let _logger = utils::initialize_logging(&config, &opts)?;
    log::debug!("{}: {:#?}", "Configuration options".bright_blue(), config.global);

    let settings = config.settings()?;
    let conn = match XConnection::new(&settings.font) {
        Ok(conn) => conn,
        Err(e) => tagwm_fatal!("{:#}", e),
    };

    WindowManager::new(conn, settings).run()
}
