mod bootstrap;

use anyhow::Result;
use viz_core::settings::Settings;
use viz_core::time_utils::TimezoneHandler;
use viz_data::composer::CompositionOptions;
use viz_data::loader::LoadMode;
use viz_runtime::pipeline::{self, PipelineConfig, PreparedRun};
use viz_ui::app::App;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("speedtest-viz v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Profile: {}, Timezone: {}, Theme: {}",
        settings.profile,
        settings.timezone,
        settings.theme
    );

    let timezone =
        TimezoneHandler::from_names(&settings.timezone, settings.input_timezone.as_deref())?;
    let config = pipeline_config(&settings, timezone);

    // Loading is the only long-running step; the TUI handles Ctrl+C itself.
    let run = tokio::select! {
        run = pipeline::prepare(config) => run?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received; aborting load");
            return Ok(());
        }
    };

    if settings.verbose {
        let report = verbose_report(&run);
        if settings.wants_json() {
            eprint!("{}", report);
        } else {
            print!("{}", report);
        }
    }

    if settings.wants_json() {
        println!("{}", serde_json::to_string_pretty(&run.to_json()?)?);
    } else {
        let composition = run.compose()?;
        App::new(&settings.theme).run(&composition)?;
    }

    Ok(())
}

fn pipeline_config(settings: &Settings, timezone: TimezoneHandler) -> PipelineConfig {
    PipelineConfig {
        paths: settings.input_paths(),
        mode: if settings.strict {
            LoadMode::Strict
        } else {
            LoadMode::Lenient
        },
        timezone,
        profile: settings.profile.clone(),
        align: settings.align,
        options: CompositionOptions {
            all_in_one: settings.all_in_one,
            title: settings.title.clone(),
        },
    }
}

/// Per-series summary tables followed by each series' anchor.
fn verbose_report(run: &PreparedRun) -> String {
    let mut out = String::new();
    for (series, summary) in run.series.iter().zip(run.summaries()) {
        out.push_str(&summary.to_string());
        match series.anchor() {
            Some(anchor) => out.push_str(&format!(
                "anchor: {}\n",
                viz_core::formatting::format_timestamp(&anchor)
            )),
            None => out.push_str("anchor: none\n"),
        }
        out.push('\n');
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_pipeline_config_from_flags() {
        let settings = Settings::parse_from([
            "speedtest-viz",
            "-p",
            "all",
            "-a",
            "-1",
            "-t",
            "Home",
            "--strict",
            "a.jsonl",
            "b.jsonl",
        ]);
        let config = pipeline_config(&settings, TimezoneHandler::utc());

        assert_eq!(
            config.paths,
            vec![PathBuf::from("a.jsonl"), PathBuf::from("b.jsonl")]
        );
        assert_eq!(config.mode, LoadMode::Strict);
        assert_eq!(config.profile, "all");
        assert!(config.align);
        assert!(config.options.all_in_one);
        assert_eq!(config.options.title.as_deref(), Some("Home"));
    }

    #[test]
    fn test_pipeline_config_defaults() {
        let settings = Settings::parse_from(["speedtest-viz"]);
        let config = pipeline_config(&settings, TimezoneHandler::utc());

        assert_eq!(config.paths, vec![PathBuf::from("/var/log/speedtest.log")]);
        assert_eq!(config.mode, LoadMode::Lenient);
        assert_eq!(config.profile, "simple");
        assert!(!config.align);
        assert_eq!(config.options, CompositionOptions::default());
    }

    #[tokio::test]
    async fn test_verbose_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("home.jsonl");
        std::fs::write(
            &path,
            "{\"timestamp\":\"2024-01-10T01:00:00+00:00\",\"download.bandwidth\":1048576,\"isp\":\"Example\"}\n",
        )
        .unwrap();

        let run = pipeline::prepare(PipelineConfig::new(vec![path], TimezoneHandler::utc()))
            .await
            .unwrap();
        let report = verbose_report(&run);

        assert!(report.contains("1 records"));
        assert!(report.contains("isp: Example"));
        assert!(report.contains("anchor: 2024-01-10 01:00 UTC"));
    }
}
