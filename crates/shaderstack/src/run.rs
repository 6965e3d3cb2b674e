use anyhow::{Context, Result};
use renderer::{check_shaders, RenderPolicy, Renderer, RendererConfig, SceneSource};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::{resolve_config_path, DemoConfig};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    if let Some((width, height)) = cli.size {
        config.window.size = [width, height];
    }

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let renderer_config = build_renderer_config(&config, render_policy(&cli))?;
    if cli.check {
        let programs = check_shaders(&renderer_config)?;
        println!("{programs} shader programs validated");
        return Ok(());
    }

    tracing::info!(
        scenes = renderer_config.scenes.len(),
        effects = renderer_config.effects.len(),
        width = renderer_config.surface_size.0,
        height = renderer_config.surface_size.1,
        "starting renderer"
    );
    Renderer::new(renderer_config).run()
}

fn load_config(cli: &Cli) -> Result<DemoConfig> {
    match resolve_config_path(cli.config.as_deref()) {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            DemoConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))
        }
        None => {
            tracing::debug!("no config file found; using built-in scenes");
            Ok(DemoConfig::default())
        }
    }
}

fn render_policy(cli: &Cli) -> RenderPolicy {
    match (&cli.export, cli.still_time) {
        (Some(path), time) => RenderPolicy::Export {
            time: time.unwrap_or(0.0),
            path: path.clone(),
        },
        (None, Some(time)) => RenderPolicy::Still { time },
        (None, None) => RenderPolicy::Animate,
    }
}

fn build_renderer_config(config: &DemoConfig, policy: RenderPolicy) -> Result<RendererConfig> {
    let scenes = config
        .scenes
        .iter()
        .map(|scene| {
            let fragment = scene
                .load_source(config.base_dir.as_deref())
                .with_context(|| format!("failed to load scene '{}'", scene.name))?;
            Ok(SceneSource::new(scene.name.clone(), fragment))
        })
        .collect::<Result<Vec<_>>>()?;
    let [width, height] = config.window.size;
    Ok(RendererConfig {
        title: config.window.title.clone(),
        surface_size: (width, height),
        scenes,
        effects: config.effects.clone(),
        policy,
    })
}
