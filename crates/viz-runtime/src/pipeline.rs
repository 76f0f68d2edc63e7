//! Async load-and-prepare pipeline.
//!
//! Files are decoded concurrently on blocking tasks, joined, then anchored,
//! aligned and handed back in input order. Composition borrows the prepared
//! series, so it happens on [`PreparedRun`] rather than inside the pipeline.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info};

use viz_core::error::Result;
use viz_core::models::Series;
use viz_core::profiles::{Profile, ProfileCatalog, DEFAULT_PROFILE};
use viz_core::time_utils::TimezoneHandler;
use viz_data::aligner::{AlignmentPlan, TimelineAligner};
use viz_data::anchor::AnchorResolver;
use viz_data::composer::{Composition, CompositionOptions, PanelComposer};
use viz_data::loader::{LoadMode, SeriesLoader};
use viz_data::reader::{expand_inputs, load_series_file};
use viz_data::summary::SeriesSummary;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Everything needed to turn input paths into composable series.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Files or directories, in display order.
    pub paths: Vec<PathBuf>,
    pub mode: LoadMode,
    pub timezone: TimezoneHandler,
    pub profile: String,
    pub align: bool,
    pub options: CompositionOptions,
}

impl PipelineConfig {
    pub fn new(paths: Vec<PathBuf>, timezone: TimezoneHandler) -> Self {
        Self {
            paths,
            mode: LoadMode::default(),
            timezone,
            profile: DEFAULT_PROFILE.to_string(),
            align: false,
            options: CompositionOptions::default(),
        }
    }
}

// ── Result ────────────────────────────────────────────────────────────────────

/// Loaded, anchored and (optionally) aligned series ready for composition.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub profile: Profile,
    pub series: Vec<Series>,
    /// Present when alignment ran.
    pub plan: Option<AlignmentPlan>,
    pub options: CompositionOptions,
    pub load_time_seconds: f64,
}

#[derive(Debug, Serialize)]
struct RunMetadata<'a> {
    generated_at: String,
    profile: &'a str,
    aligned: bool,
    series: Vec<SeriesMetadata<'a>>,
    load_time_seconds: f64,
}

#[derive(Debug, Serialize)]
struct SeriesMetadata<'a> {
    id: &'a str,
    records: usize,
    anchor: Option<String>,
}

impl PreparedRun {
    pub fn compose(&self) -> Result<Composition<'_>> {
        PanelComposer::global().compose(&self.profile, &self.series, &self.options)
    }

    pub fn summaries(&self) -> Vec<SeriesSummary> {
        self.series.iter().map(SeriesSummary::from_series).collect()
    }

    /// The composition plus run metadata as one JSON document.
    pub fn to_json(&self) -> Result<Value> {
        let composition = self.compose()?;
        let metadata = RunMetadata {
            generated_at: chrono::Utc::now().to_rfc3339(),
            profile: &self.profile.name,
            aligned: self.plan.is_some(),
            series: self
                .series
                .iter()
                .map(|s| SeriesMetadata {
                    id: s.id(),
                    records: s.len(),
                    anchor: s.anchor().map(|a| a.fixed_offset().to_rfc3339()),
                })
                .collect(),
            load_time_seconds: self.load_time_seconds,
        };
        Ok(serde_json::json!({
            "metadata": serde_json::to_value(&metadata)?,
            "composition": serde_json::to_value(&composition)?,
        }))
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Resolve the profile, load every input, then anchor and align.
///
/// The profile is looked up before any file is touched so an unknown name
/// fails fast. The first failing file aborts the run.
pub async fn prepare(config: PipelineConfig) -> Result<PreparedRun> {
    let profile = ProfileCatalog::global().get(&config.profile)?.clone();
    let start = Instant::now();

    let paths = expand_inputs(&config.paths)?;
    let loader = SeriesLoader::new(config.mode, config.timezone);
    let mut series = load_all(paths, loader).await?;

    // Barrier passed: every series is owned here and loaded.
    AnchorResolver::default().resolve_all(&series);
    let plan = config.align.then(|| TimelineAligner.align(&mut series));

    let load_time_seconds = start.elapsed().as_secs_f64();
    info!(
        "Prepared {} series for profile {} in {:.3}s",
        series.len(),
        profile.name,
        load_time_seconds
    );

    Ok(PreparedRun {
        profile,
        series,
        plan,
        options: config.options,
        load_time_seconds,
    })
}

/// Load each path on its own blocking task and return the series in input
/// order.
pub async fn load_all(paths: Vec<PathBuf>, loader: SeriesLoader) -> Result<Vec<Series>> {
    let mut tasks = JoinSet::new();
    for (index, path) in paths.iter().cloned().enumerate() {
        tasks.spawn_blocking(move || (index, load_series_file(&path, &loader)));
    }

    let mut slots: Vec<Option<Series>> = vec![None; paths.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined.map_err(std::io::Error::from)?;
        let series = result?;
        debug!("Loaded {} ({} records)", series.id(), series.len());
        slots[index] = Some(series);
    }

    Ok(slots.into_iter().flatten().collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;
    use viz_core::dimensions::Dimension;
    use viz_core::error::VizError;

    // ── helpers ───────────────────────────────────────────────────────────

    fn write_jsonl(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn line(stamp: &str, down_bps: u64, up_bps: Option<u64>) -> String {
        let mut value = serde_json::json!({
            "timestamp": stamp,
            "download.bandwidth": down_bps,
            "ping.latency": 4.2,
            "isp": "Example ISP",
        });
        if let Some(up) = up_bps {
            value["upload.bandwidth"] = serde_json::json!(up);
        }
        value.to_string()
    }

    fn tokyo() -> TimezoneHandler {
        TimezoneHandler::new(Tz::Asia__Tokyo, Tz::Asia__Tokyo)
    }

    /// A: Monday start, anchored Wed 2024-01-10. B: Thursday start, anchored
    /// Wed 2024-01-17 and without upload.
    fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
        let a = write_jsonl(
            dir,
            "a.jsonl",
            &[
                line("2024-01-08 00:00:00", 104_857_600, Some(10_485_760)),
                line("2024-01-10 01:00:00", 104_857_600, Some(10_485_760)),
            ],
        );
        let b = write_jsonl(
            dir,
            "b.jsonl",
            &[
                line("2024-01-11 00:00:00", 52_428_800, None),
                line("2024-01-17 01:00:00", 52_428_800, None),
            ],
        );
        (a, b)
    }

    // ── load_all ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_load_all_preserves_input_order() {
        let dir = TempDir::new().unwrap();
        let (a, b) = fixture(dir.path());

        let loader = SeriesLoader::new(LoadMode::Lenient, tokyo());
        let series = load_all(vec![b.clone(), a.clone()], loader).await.unwrap();
        let ids: Vec<&str> = series.iter().map(Series::id).collect();
        assert_eq!(ids, vec![b.display().to_string(), a.display().to_string()]);
    }

    #[tokio::test]
    async fn test_load_all_fails_on_first_bad_file() {
        let dir = TempDir::new().unwrap();
        let (a, _) = fixture(dir.path());
        let bad = write_jsonl(dir.path(), "bad.jsonl", &["{\"download.bandwidth\": 1}".to_string()]);

        let loader = SeriesLoader::new(LoadMode::Lenient, tokyo());
        let err = load_all(vec![a, bad], loader).await.unwrap_err();
        assert!(matches!(err, VizError::MalformedRecord { ref field, .. } if field == "timestamp"));
    }

    // ── prepare ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_prepare_aligns_and_composes() {
        let dir = TempDir::new().unwrap();
        let (a, b) = fixture(dir.path());

        let mut config = PipelineConfig::new(vec![a, b], tokyo());
        config.align = true;
        let run = prepare(config).await.unwrap();

        let anchor = Tz::Asia__Tokyo.with_ymd_and_hms(2024, 1, 10, 1, 0, 0).unwrap();
        assert_eq!(run.series[0].records()[1].timestamp, anchor);
        assert_eq!(run.series[1].records()[1].timestamp, anchor);
        assert!(run.plan.is_some());

        let composition = run.compose().unwrap();
        assert_eq!(composition.panels.len(), 2);
        assert_eq!(composition.panels[0].dimension, Dimension::Download);
        assert_eq!(composition.panels[0].draws.len(), 2);
        assert_eq!(composition.panels[1].draws.len(), 1);
    }

    #[tokio::test]
    async fn test_prepare_without_align_keeps_timestamps() {
        let dir = TempDir::new().unwrap();
        let (a, b) = fixture(dir.path());

        let run = prepare(PipelineConfig::new(vec![a, b], tokyo())).await.unwrap();
        let expected = Tz::Asia__Tokyo.with_ymd_and_hms(2024, 1, 17, 1, 0, 0).unwrap();
        assert_eq!(run.series[1].records()[1].timestamp, expected);
        assert!(run.plan.is_none());
        // Anchors are resolved regardless.
        assert_eq!(run.series[1].anchor(), Some(expected));
    }

    #[tokio::test]
    async fn test_prepare_unknown_profile_fails_before_loading() {
        let mut config = PipelineConfig::new(
            vec![PathBuf::from("/tmp/does-not-exist-speedtest-viz.jsonl")],
            tokyo(),
        );
        config.profile = "bogus".to_string();
        let err = prepare(config).await.unwrap_err();
        assert!(matches!(err, VizError::UnknownProfile(_)));
    }

    #[tokio::test]
    async fn test_prepare_missing_file() {
        let config = PipelineConfig::new(
            vec![PathBuf::from("/tmp/does-not-exist-speedtest-viz.jsonl")],
            tokyo(),
        );
        let err = prepare(config).await.unwrap_err();
        assert!(matches!(err, VizError::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_prepare_directory_input() {
        let dir = TempDir::new().unwrap();
        fixture(dir.path());

        let run = prepare(PipelineConfig::new(vec![dir.path().to_path_buf()], tokyo()))
            .await
            .unwrap();
        assert_eq!(run.series.len(), 2);
        assert!(run.series[0].id().ends_with("a.jsonl"));
        assert_eq!(run.summaries()[0].records, 2);
    }

    #[tokio::test]
    async fn test_to_json() {
        let dir = TempDir::new().unwrap();
        let (a, _) = fixture(dir.path());

        let mut config = PipelineConfig::new(vec![a], tokyo());
        config.options.title = Some("Home".to_string());
        let run = prepare(config).await.unwrap();
        let json = run.to_json().unwrap();

        assert_eq!(json["metadata"]["profile"], "simple");
        assert_eq!(json["metadata"]["aligned"], false);
        assert_eq!(
            json["metadata"]["series"][0]["anchor"],
            "2024-01-10T01:00:00+09:00"
        );
        assert_eq!(json["composition"]["title"], "Home");
        assert_eq!(
            json["composition"]["panels"][0]["figure_title"],
            "Home(download.bandwidth)"
        );
        assert_eq!(json["composition"]["panels"][0]["draws"][0]["points"][0][1], 100.0);
    }
}
