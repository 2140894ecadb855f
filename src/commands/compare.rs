use std::path::PathBuf;
use std::process::ExitCode;

use h2h_lib::{
    CompareOutput, ComparisonView, EntityId, EntityKind, H2hError, H2hOutput, SideReport,
    StatScope, Summary, H2H_OUTPUT_VERSION,
};

use crate::cli::{KindArg, OutputFormat};
use crate::formatting::{render_error, render_payload, write_output};
use crate::pipeline::{build_source, new_session, run_comparison, CompareRequest};
use crate::settings::{format_effective_config, load_config, resolve_settings};

/// Arguments of `h2h compare`, as typed on the command line.
#[derive(Debug, Clone)]
pub struct CompareArgs {
    pub kind: KindArg,
    pub entity1: String,
    pub entity2: String,
    pub scope1: String,
    pub scope2: String,
    pub metrics: Option<Vec<String>>,
    pub api_url: Option<String>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

/// Run the compare command.
pub async fn run_compare(config_path: Option<PathBuf>, verbose: bool, args: CompareArgs) -> ExitCode {
    let format = args.format;
    let output = args.output.clone();

    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let settings = match resolve_settings(&config, args.api_url.as_deref(), args.metrics.as_deref())
    {
        Ok(settings) => settings,
        Err(err) => return render_error(err, format, output),
    };
    if verbose {
        log::info!("{}", format_effective_config(&settings, config_path.as_deref()));
    }

    let request = match parse_request(&args) {
        Ok(request) => request,
        Err(err) => return render_error(err, format, output),
    };
    let kind = EntityKind::from(args.kind);

    let source = match build_source(&settings) {
        Ok(source) => source,
        Err(err) => return render_error(err, format, output),
    };
    let session = new_session(kind, source, &settings);

    log::info!(
        "Comparing {} #{} ({}) with #{} ({})",
        session.kind(),
        request.entity1,
        request.scope1,
        request.entity2,
        request.scope2
    );
    let view = match run_comparison(&session, &settings, &request).await {
        Ok(view) => view,
        Err(payload) => return render_payload(payload, format, output),
    };
    log::debug!(
        "{} requests issued, {} stat records cached",
        session.fetcher().request_count(),
        session.fetcher().cached_len()
    );

    let scored = view.score.is_available();
    let body = H2hOutput::Compare(build_output(&view, &request));
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(H2hError::Config(err.to_string()), format, output);
    }
    exit_code_for_compare(scored)
}

fn parse_request(args: &CompareArgs) -> Result<CompareRequest, H2hError> {
    let entity = |raw: &str| raw.parse::<EntityId>().map_err(H2hError::selection);
    let scope = |raw: &str| raw.parse::<StatScope>().map_err(H2hError::selection);
    Ok(CompareRequest {
        entity1: entity(&args.entity1)?,
        entity2: entity(&args.entity2)?,
        scope1: scope(&args.scope1)?,
        scope2: scope(&args.scope2)?,
    })
}

fn build_output(view: &ComparisonView, request: &CompareRequest) -> CompareOutput {
    let side1 = SideReport {
        id: request.entity1,
        scope: request.scope1.to_string(),
        entity: view.entity1.clone(),
        stats: view.stats1,
    };
    let side2 = SideReport {
        id: request.entity2,
        scope: request.scope2.to_string(),
        entity: view.entity2.clone(),
        stats: view.stats2,
    };
    let summary = generate_summary(view, &side1.display_name(), &side2.display_name());

    CompareOutput {
        version: H2H_OUTPUT_VERSION.to_string(),
        kind: view.selection.kind,
        phase: view.phase,
        side1,
        side2,
        metrics: view.selection.enabled.iter().copied().collect(),
        score: view.score,
        breakdown: view.breakdown.clone(),
        summary: Some(summary),
    }
}

fn generate_summary(view: &ComparisonView, name1: &str, name2: &str) -> Summary {
    let mut highlights = Vec::new();

    let (Some(score1), Some(score2)) = (view.score.score1, view.score.score2) else {
        highlights.push(
            "No metrics enabled; pass --metrics to choose what to compare.".to_string(),
        );
        return Summary { highlights };
    };

    let overall = if (score1 - score2).abs() < f64::EPSILON {
        format!("{name1} and {name2} are level ({score1:.1} each)")
    } else if score1 > score2 {
        format!("{name1} leads {score1:.1} to {score2:.1}")
    } else {
        format!("{name2} leads {score2:.1} to {score1:.1}")
    };
    highlights.push(overall);

    let (mut ahead1, mut ahead2) = (0, 0);
    for row in &view.breakdown {
        if row.score1 > row.score2 {
            ahead1 += 1;
        } else if row.score2 > row.score1 {
            ahead2 += 1;
        }
    }
    let total = view.breakdown.len();
    highlights.push(format!(
        "{name1} ahead on {ahead1} of {total} metrics, {name2} ahead on {ahead2}"
    ));

    // Largest gap first.
    if let Some(row) = view
        .breakdown
        .iter()
        .filter(|r| r.score1 != r.score2)
        .max_by(|a, b| {
            (a.score1 - a.score2)
                .abs()
                .total_cmp(&(b.score1 - b.score2).abs())
        })
    {
        let leader = if row.score1 > row.score2 { name1 } else { name2 };
        highlights.push(format!(
            "Biggest gap: {} ({} vs {}), favouring {leader}",
            row.key.label(),
            row.value1,
            row.value2
        ));
    }

    Summary { highlights }
}

fn exit_code_for_compare(scored: bool) -> ExitCode {
    if scored {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
