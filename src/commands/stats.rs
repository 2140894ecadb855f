use std::path::PathBuf;
use std::process::ExitCode;

use h2h_lib::{
    EntityId, EntityKind, EntityRef, H2hError, H2hOutput, StatFetcher, StatScope, StatsOutput,
    H2H_OUTPUT_VERSION,
};

use crate::cli::{KindArg, OutputFormat};
use crate::formatting::{render_error, write_output};
use crate::pipeline::build_source;
use crate::settings::{format_effective_config, load_config, resolve_settings};

/// Arguments of `h2h stats`.
#[derive(Debug, Clone)]
pub struct StatsArgs {
    pub kind: KindArg,
    pub entity: String,
    pub scope: String,
    pub api_url: Option<String>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

/// Run the stats command.
pub async fn run_stats(config_path: Option<PathBuf>, verbose: bool, args: StatsArgs) -> ExitCode {
    let format = args.format;
    let output = args.output.clone();

    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let settings = match resolve_settings(&config, args.api_url.as_deref(), None) {
        Ok(settings) => settings,
        Err(err) => return render_error(err, format, output),
    };
    if verbose {
        log::info!("{}", format_effective_config(&settings, config_path.as_deref()));
    }

    let (id, scope) = match parse_target(&args.entity, &args.scope) {
        Ok(target) => target,
        Err(err) => return render_error(err, format, output),
    };
    let entity = EntityRef::new(EntityKind::from(args.kind), id);

    let source = match build_source(&settings) {
        Ok(source) => source,
        Err(err) => return render_error(err, format, output),
    };
    let fetcher = StatFetcher::with_capacity(source, settings.cache_capacity);

    let (stats, profile) = futures::join!(
        fetcher.fetch_stats(entity, &scope),
        fetcher.fetch_entity(entity)
    );
    let stats = match stats {
        Ok(stats) => stats,
        Err(err) => return render_error(err, format, output),
    };
    let profile = match profile {
        Ok(profile) => Some(profile),
        Err(err) => {
            log::warn!("No profile for {entity}: {err}");
            None
        }
    };

    let body = H2hOutput::Stats(StatsOutput {
        version: H2H_OUTPUT_VERSION.to_string(),
        kind: entity.kind,
        id,
        scope: scope.to_string(),
        entity: profile,
        stats,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(H2hError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}

fn parse_target(entity: &str, scope: &str) -> Result<(EntityId, StatScope), H2hError> {
    let id = entity.parse::<EntityId>().map_err(H2hError::selection)?;
    let scope = scope.parse::<StatScope>().map_err(H2hError::selection)?;
    Ok((id, scope))
}
