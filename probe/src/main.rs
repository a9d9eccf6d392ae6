use {
    anyhow::{bail, Context as _},
    chrono::Local,
    clap::{Parser, ValueEnum},
    glimpse::{
        detect, replay::load_frame, Appearance, DetectionConfig, Frame, Landmark, Landmarks,
        Matching, Offset, Score, Session, Stability, StableOptions, Timer,
    },
    glimpse_desktop::{Desktop, DesktopSettings},
    itertools::Itertools,
    std::{
        path::{Path, PathBuf},
        process,
        time::Duration,
    },
    tracing::info,
    tracing_subscriber::{filter::LevelFilter, EnvFilter},
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
enum Args {
    /// Save a screenshot of the primary monitor.
    Capture {
        #[clap(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Report whether landmarks are present on a saved frame.
    Check {
        #[clap(long)]
        manifest: PathBuf,
        #[clap(long)]
        frame: PathBuf,
        /// Landmarks to check. All landmarks are checked if omitted.
        #[clap(long)]
        name: Vec<String>,
        /// Vertical template search offset. Uses the configured one if omitted.
        #[clap(long)]
        offset: Option<u32>,
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Wait for a landmark on the live desktop.
    Wait {
        #[clap(long)]
        manifest: PathBuf,
        #[clap(long)]
        name: String,
        #[clap(long, value_enum, default_value_t = WaitMode::Appear)]
        mode: WaitMode,
        /// Timeout in seconds.
        #[clap(long)]
        timeout: Option<f32>,
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WaitMode {
    Appear,
    Disappear,
    Stable,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .init();

    match Args::parse() {
        Args::Capture { dir } => {
            let path = capture(&dir)?;
            println!("{}", path.display());
        }
        Args::Check {
            manifest,
            frame,
            name,
            offset,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let landmarks = Landmarks::load(&manifest)?;
            let frame = load_frame(&frame)?;
            let selected = select(&landmarks, &name)?;
            let offset = offset.map_or(Offset::Default, Offset::Vertical);
            for line in check(&selected, &frame, offset, &config) {
                println!("{line}");
            }
        }
        Args::Wait {
            manifest,
            name,
            mode,
            timeout,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let landmarks = Landmarks::load(&manifest)?;
            let landmark = landmarks.require(&name)?;
            let timeout = timeout
                .map(Duration::try_from_secs_f32)
                .transpose()
                .context("invalid timeout")?;
            let desktop = Desktop::new(DesktopSettings::default())?;
            let mut session = Session::new(desktop, config);
            if !wait(&mut session, landmark, mode, timeout)? {
                process::exit(1);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DetectionConfig> {
    match path {
        Some(path) => DetectionConfig::load(path),
        None => Ok(DetectionConfig::default()),
    }
}

fn capture(dir: &Path) -> anyhow::Result<PathBuf> {
    let desktop = Desktop::new(DesktopSettings::default())?;
    fs_err::create_dir_all(dir)?;
    let path = dir.join(format!("{}.png", Local::now().format("%d-%m-%Y_%I-%M-%S_%p")));
    glimpse::FrameSource::frame(&desktop)
        .save(&path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    info!("saved {}", path.display());
    Ok(path)
}

fn select<'a>(landmarks: &'a Landmarks, names: &[String]) -> anyhow::Result<Vec<&'a Landmark>> {
    if names.is_empty() {
        return Ok(landmarks.values().collect());
    }
    names.iter().map(|name| landmarks.require(name)).collect()
}

fn matching_for(landmark: &Landmark, offset: Offset) -> Matching {
    if landmark.template().is_some() {
        Matching::template_at(offset)
    } else {
        Matching::color()
    }
}

fn check(
    landmarks: &[&Landmark],
    frame: &Frame,
    offset: Offset,
    config: &DetectionConfig,
) -> Vec<String> {
    landmarks
        .iter()
        .map(|landmark| {
            let Appearance {
                appeared,
                score,
                offset: found_at,
            } = detect(landmark, frame, matching_for(landmark, offset), config);
            let score = match score {
                Score::Distance(distance) => format!("distance={}", distance.0),
                Score::Similarity(similarity) => format!("similarity={similarity:.3}"),
            };
            format!(
                "{landmark} ({}): appeared={appeared} {score} offset=({}, {})",
                landmark.kind(),
                found_at.x,
                found_at.y
            )
        })
        .collect_vec()
}

/// Returns `false` if the wait ran into its timeout.
fn wait(
    session: &mut Session<Desktop>,
    landmark: &Landmark,
    mode: WaitMode,
    timeout: Option<Duration>,
) -> anyhow::Result<bool> {
    let matching = matching_for(landmark, Offset::Default);
    let done = match (mode, timeout) {
        (WaitMode::Appear, None) => {
            session.wait_until_appear(landmark, matching, false)?;
            true
        }
        (WaitMode::Appear, Some(timeout)) => {
            session.wait_until_appear_within(landmark, matching, timeout, false)?
        }
        (WaitMode::Disappear, None) => {
            session.wait_until_disappear(landmark, matching, false)?;
            true
        }
        (WaitMode::Disappear, Some(_)) => bail!("--timeout is not supported with --mode disappear"),
        (WaitMode::Stable, timeout) => {
            let mut options = StableOptions::from_config(session.config());
            if let Some(timeout) = timeout {
                options.timeout = Timer::with_count(timeout, options.timeout.count());
            }
            session.wait_until_stable(landmark, options)? == Stability::Stable
        }
    };
    info!("{landmark}: {mode:?} done={done}");
    Ok(done)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        image::{Rgb, RgbImage},
    };

    #[test]
    fn check_reports_each_landmark() {
        let dir = tempfile::tempdir().unwrap();
        let mut frame = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
        for y in 10..20 {
            for x in 10..20 {
                frame.put_pixel(x, y, Rgb([200, 40, 40]));
            }
        }
        let manifest = dir.path().join("landmarks.json");
        fs_err::write(
            &manifest,
            r#"[
                { "name": "red", "area": [10, 10, 10, 10], "color": [200, 40, 40] },
                { "name": "blue", "area": [10, 10, 10, 10], "color": [40, 40, 200] }
            ]"#,
        )
        .unwrap();

        let landmarks = Landmarks::load(&manifest).unwrap();
        let selected = select(&landmarks, &[]).unwrap();
        let lines = check(&selected, &frame, Offset::Default, &DetectionConfig::default());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("blue (color): appeared=false"), "{}", lines[0]);
        assert!(lines[1].starts_with("red (color): appeared=true distance=0"), "{}", lines[1]);

        assert!(select(&landmarks, &["green".to_owned()]).is_err());
    }
}
