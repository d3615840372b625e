//! `skyisle`: inspect a spheroid world from the command line.
//!
//! Run with: `cargo run -p skyisle-cli -- locate 120 80 -45`

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use skyisle_config::{CliArgs, Config, default_config_dir};
use skyisle_coords::{BlockPos, ChunkPos};
use skyisle_gen::{
    AsyncChunkGenerator, CatalogError, ChunkGenerator, GenerationTask, TemplateCatalog,
    default_catalog, load_catalog_file, locate,
};
use skyisle_voxel::{LootTableSet, MaterialRegistry};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "skyisle", about = "Deterministic spheroid world generator")]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe the spheroid closest to a block position.
    Locate {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
        #[arg(allow_negative_numbers = true)]
        z: i32,
        /// Only consider spheroids of this template (searches neighboring systems).
        #[arg(long)]
        template: Option<String>,
    },
    /// Populate the chunks around a chunk position and print a summary.
    Generate {
        #[arg(allow_negative_numbers = true)]
        chunk_x: i32,
        #[arg(allow_negative_numbers = true)]
        chunk_z: i32,
        /// Square radius in chunks around the center chunk.
        #[arg(long, default_value_t = 0)]
        radius: u32,
    },
    /// List the catalog's templates by category.
    Templates,
}

fn load_catalog(
    config: &Config,
    materials: &MaterialRegistry,
) -> Result<TemplateCatalog, CatalogError> {
    let loot = LootTableSet::with_defaults();
    match &config.generation.catalog_path {
        Some(path) => load_catalog_file(path, materials, &loot),
        None => default_catalog(materials, &loot),
    }
}

fn run_generate(generator: ChunkGenerator, config: &Config, center: ChunkPos, radius: u32) -> bool {
    let pool = match AsyncChunkGenerator::from_config(generator, &config.workers) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to start workers: {e}");
            return false;
        }
    };

    let r = radius as i32;
    let mut queue: Vec<ChunkPos> = (-r..=r)
        .flat_map(|dx| (-r..=r).map(move |dz| ChunkPos::new(center.x + dx, center.z + dz)))
        .collect();
    let total = queue.len();
    queue.reverse();

    let mut ok = true;
    let mut received = 0;
    while received < total {
        while let Some(chunk) = queue.pop() {
            if let Err(task) = pool.submit(GenerationTask { chunk }) {
                queue.push(task.chunk);
                break;
            }
        }
        for generated in pool.drain_results() {
            received += 1;
            match generated.result {
                Ok((column, report)) => println!(
                    "chunk {}: {} spheroids, {} voxels, {} decorations, {} spawns, \
                     {} palette entries ({} us)",
                    report.chunk,
                    report.spheroids,
                    report.voxels_written,
                    report.decorations_written,
                    report.spawns.len(),
                    column.palette_len(),
                    generated.generation_time_us
                ),
                Err(e) => {
                    error!("{e}");
                    ok = false;
                }
            }
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    ok
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_dir = cli.args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&cli.args);

    let log_dir = config_dir.join("logs");
    skyisle_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }
    info!(
        "World seed {} | system size {} chunks",
        config.world.seed, config.world.system_size_chunks
    );

    let materials = Arc::new(MaterialRegistry::with_defaults());
    let catalog = match load_catalog(&config, &materials) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if catalog.is_empty() {
        warn!("Catalog has no usable templates; the world will be empty");
    }

    let generator =
        ChunkGenerator::from_config(&config, Arc::clone(&catalog), Arc::clone(&materials));
    let generator = match generator {
        Ok(generator) => generator,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Locate { x, y, z, template } => {
            let out = locate(
                generator.systems(),
                &materials,
                BlockPos::new(x, y, z),
                template.as_deref(),
            );
            println!("{out}");
        }
        Command::Generate {
            chunk_x,
            chunk_z,
            radius,
        } => {
            if !run_generate(generator, &config, ChunkPos::new(chunk_x, chunk_z), radius) {
                return ExitCode::FAILURE;
            }
        }
        Command::Templates => {
            for category in catalog.categories() {
                println!("{category}:");
                for (template, weight) in catalog.templates_in(category) {
                    let kind = template.shape.kind_name();
                    println!("  {} ({kind}, weight {weight})", template.id);
                }
            }
        }
    }
    ExitCode::SUCCESS
}
