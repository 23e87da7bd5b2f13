//! Durable, directory-based checkpoints of a swarm.
//!
//! A checkpoint directory holds five files:
//!
//! | File | Content |
//! |---|---|
//! | `pso_attributes.json` | [`SwarmConfig`]: bounds, dimensions, coefficients, mode |
//! | `individual_states.csv` | one row per particle: position ‖ velocity ‖ best position ‖ best fitness |
//! | `global_state.csv` | one row: global best position ‖ global best fitness ‖ iteration |
//! | `pareto_front.csv` | one row per front member: position ‖ fitness |
//! | `history.csv` | one row per completed iteration: global best fitness |
//!
//! Tables are headerless CSV. Floats use Rust's shortest round-trip
//! formatting, so a save followed by a load reproduces every value
//! bit-for-bit (`inf` included). Each file is written to a temporary
//! sibling and renamed into place, and the whole save holds an exclusive
//! `fs2` lock on `.lock` in the directory; loads take a shared lock.
//!
//! Current fitness is not stored: a resumed swarm re-evaluates every
//! particle on its next iteration.
//!
//! Separately, [`write_history_snapshot`] records one file per iteration
//! (`iteration<k>.csv`, rows of position ‖ fitness) for offline analysis.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::particle::FrontMember;
use crate::swarm::SwarmConfig;

const ATTRIBUTES_FILE: &str = "pso_attributes.json";
const PARTICLES_FILE: &str = "individual_states.csv";
const GLOBAL_STATE_FILE: &str = "global_state.csv";
const FRONT_FILE: &str = "pareto_front.csv";
const HISTORY_FILE: &str = "history.csv";
const LOCK_FILE: &str = ".lock";

/// Persisted state of one particle.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleState {
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub best_position: Vec<f64>,
    pub best_fitness: Vec<f64>,
}

/// Everything needed to resume a swarm exactly where it stopped.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub config: SwarmConfig,
    pub particles: Vec<ParticleState>,
    pub global_best_position: Vec<f64>,
    pub global_best_fitness: Vec<f64>,
    /// Number of completed iterations.
    pub iteration: u64,
    pub pareto_front: Vec<FrontMember>,
    /// Global best fitness after each completed iteration.
    pub history: Vec<Vec<f64>>,
}

/// Reads and writes checkpoints in one directory.
///
/// # Examples
///
/// ```no_run
/// use mopso::{Bounds, CheckpointStore, Evaluator, Swarm};
///
/// let bounds = Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
/// let mut swarm = Swarm::builder(bounds)
///     .num_objectives(2)
///     .num_particles(10)
///     .seed(1)
///     .build(Evaluator::individual(|x: &[f64]| x.to_vec()))
///     .unwrap();
/// swarm.optimize(5).unwrap();
///
/// let store = CheckpointStore::new("checkpoint");
/// store.save(&swarm.checkpoint()).unwrap();
/// assert_eq!(store.load().unwrap().iteration, 5);
/// ```
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store for `dir`. Nothing is touched until the first save or load.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns `true` if the directory holds an attributes record.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.dir.join(ATTRIBUTES_FILE).is_file()
    }

    /// Write only the attributes record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) if the directory
    /// or file cannot be written.
    pub fn save_attributes(&self, config: &SwarmConfig) -> crate::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let _lock = self.lock(true)?;
        self.write_attributes(config)
    }

    /// Write a complete checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) if any file cannot
    /// be written.
    pub fn save(&self, checkpoint: &Checkpoint) -> crate::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let _lock = self.lock(true)?;

        self.write_attributes(&checkpoint.config)?;

        let particle_rows: Vec<Vec<f64>> = checkpoint
            .particles
            .iter()
            .map(|p| concat(&[&p.position, &p.velocity, &p.best_position, &p.best_fitness]))
            .collect();
        self.write_table(PARTICLES_FILE, &particle_rows)?;

        #[allow(clippy::cast_precision_loss)]
        let iteration = checkpoint.iteration as f64;
        let global_row = concat(&[
            &checkpoint.global_best_position,
            &checkpoint.global_best_fitness,
            &[iteration],
        ]);
        self.write_table(GLOBAL_STATE_FILE, &[global_row])?;

        let front_rows: Vec<Vec<f64>> = checkpoint
            .pareto_front
            .iter()
            .map(|m| concat(&[m.position(), m.fitness()]))
            .collect();
        self.write_table(FRONT_FILE, &front_rows)?;

        self.write_table(HISTORY_FILE, &checkpoint.history)?;

        trace_info!(
            dir = %self.dir.display(),
            iteration = checkpoint.iteration,
            "checkpoint saved"
        );
        Ok(())
    }

    /// Read and validate only the attributes record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Checkpoint`](crate::Error::Checkpoint) if the file
    /// is missing, unparsable, or describes an invalid configuration.
    pub fn load_attributes(&self) -> crate::Result<SwarmConfig> {
        let _lock = self.lock(false)?;
        self.read_attributes()
    }

    /// Read and validate a complete checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Checkpoint`](crate::Error::Checkpoint) if a file is
    /// missing or any table disagrees with the attributes record (row
    /// counts, row widths, positions outside the bounds).
    pub fn load(&self) -> crate::Result<Checkpoint> {
        let _lock = self.lock(false)?;
        let config = self.read_attributes()?;
        let n = config.num_params;
        let m = config.num_objectives;

        let particle_rows = self.read_table(PARTICLES_FILE, 3 * n + m)?;
        if particle_rows.len() != config.num_particles {
            return Err(crate::Error::Checkpoint(format!(
                "{PARTICLES_FILE} has {} rows, expected {}",
                particle_rows.len(),
                config.num_particles
            )));
        }
        let particles = particle_rows
            .into_iter()
            .map(|row| {
                let state = ParticleState {
                    position: row[..n].to_vec(),
                    velocity: row[n..2 * n].to_vec(),
                    best_position: row[2 * n..3 * n].to_vec(),
                    best_fitness: row[3 * n..].to_vec(),
                };
                if config.bounds.contains(&state.position) {
                    Ok(state)
                } else {
                    Err(crate::Error::Checkpoint(format!(
                        "particle position {:?} lies outside the bounds",
                        state.position
                    )))
                }
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let global_rows = self.read_table(GLOBAL_STATE_FILE, n + m + 1)?;
        let [global_row] = <[Vec<f64>; 1]>::try_from(global_rows).map_err(|rows| {
            crate::Error::Checkpoint(format!(
                "{GLOBAL_STATE_FILE} has {} rows, expected 1",
                rows.len()
            ))
        })?;
        let iteration = parse_iteration(global_row[n + m])?;

        let pareto_front = self
            .read_table(FRONT_FILE, n + m)?
            .into_iter()
            .map(|row| {
                let position = row[..n].to_vec();
                if config.bounds.contains(&position) {
                    Ok(FrontMember::new(position, row[n..].to_vec()))
                } else {
                    Err(crate::Error::Checkpoint(format!(
                        "front position {position:?} lies outside the bounds"
                    )))
                }
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let history = self.read_table(HISTORY_FILE, m)?;

        trace_info!(dir = %self.dir.display(), iteration, "checkpoint loaded");
        Ok(Checkpoint {
            particles,
            global_best_position: global_row[..n].to_vec(),
            global_best_fitness: global_row[n..n + m].to_vec(),
            iteration,
            pareto_front,
            history,
            config,
        })
    }

    fn lock(&self, exclusive: bool) -> crate::Result<LockGuard> {
        if !exclusive && !self.dir.is_dir() {
            return Err(crate::Error::Checkpoint(format!(
                "checkpoint directory {} does not exist",
                self.dir.display()
            )));
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))?;
        if exclusive {
            file.lock_exclusive()?;
        } else {
            file.lock_shared()?;
        }
        Ok(LockGuard(file))
    }

    fn write_attributes(&self, config: &SwarmConfig) -> crate::Result<()> {
        let json = serde_json::to_vec_pretty(config)
            .map_err(|e| crate::Error::Storage(e.to_string()))?;
        write_atomic(&self.dir.join(ATTRIBUTES_FILE), &json)
    }

    fn read_attributes(&self) -> crate::Result<SwarmConfig> {
        let path = self.dir.join(ATTRIBUTES_FILE);
        let file = open_existing(&path)?;
        let config: SwarmConfig = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| crate::Error::Checkpoint(format!("{}: {e}", path.display())))?;
        config
            .validate()
            .map_err(|e| crate::Error::Checkpoint(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    fn write_table(&self, name: &str, rows: &[Vec<f64>]) -> crate::Result<()> {
        write_atomic(&self.dir.join(name), &encode_rows(rows)?)
    }

    fn read_table(&self, name: &str, width: usize) -> crate::Result<Vec<Vec<f64>>> {
        read_rows(&self.dir.join(name), width)
    }
}

/// Releases the `fs2` lock when dropped.
struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the file releases the lock as well; unlocking explicitly
        // just makes it prompt.
        let _ = FileExt::unlock(&self.0);
    }
}

/// Write the positions and fitness of one iteration to `dir/iteration<k>.csv`.
///
/// # Errors
///
/// Returns [`Error::Storage`](crate::Error::Storage) if the directory or
/// file cannot be written.
pub fn write_history_snapshot(
    dir: &Path,
    iteration: u64,
    members: &[FrontMember],
) -> crate::Result<()> {
    fs::create_dir_all(dir)?;
    let rows: Vec<Vec<f64>> = members
        .iter()
        .map(|m| concat(&[m.position(), m.fitness()]))
        .collect();
    write_atomic(&history_snapshot_path(dir, iteration), &encode_rows(&rows)?)
}

/// Read back a file written by [`write_history_snapshot`].
///
/// # Errors
///
/// Returns [`Error::Checkpoint`](crate::Error::Checkpoint) if the file is
/// missing or a row is not `num_params + num_objectives` numbers wide.
pub fn read_history_snapshot(
    dir: &Path,
    iteration: u64,
    num_params: usize,
    num_objectives: usize,
) -> crate::Result<Vec<FrontMember>> {
    let rows = read_rows(
        &history_snapshot_path(dir, iteration),
        num_params + num_objectives,
    )?;
    Ok(rows
        .into_iter()
        .map(|row| FrontMember::new(row[..num_params].to_vec(), row[num_params..].to_vec()))
        .collect())
}

fn history_snapshot_path(dir: &Path, iteration: u64) -> PathBuf {
    dir.join(format!("iteration{iteration}.csv"))
}

fn concat(parts: &[&[f64]]) -> Vec<f64> {
    parts.iter().flat_map(|p| p.iter().copied()).collect()
}

fn encode_rows(rows: &[Vec<f64>]) -> crate::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(row.iter().map(ToString::to_string))
            .map_err(|e| crate::Error::Storage(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| crate::Error::Storage(e.to_string()))
}

fn read_rows(path: &Path, width: usize) -> crate::Result<Vec<Vec<f64>>> {
    let file = open_existing(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| crate::Error::Checkpoint(format!("{}: {e}", path.display())))?;
        if record.len() != width {
            return Err(crate::Error::Checkpoint(format!(
                "{} row {line} has {} columns, expected {width}",
                path.display(),
                record.len()
            )));
        }
        let row = record
            .iter()
            .map(|field| {
                field.parse::<f64>().map_err(|e| {
                    crate::Error::Checkpoint(format!(
                        "{} row {line}: {field:?}: {e}",
                        path.display()
                    ))
                })
            })
            .collect::<crate::Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

fn open_existing(path: &Path) -> crate::Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            crate::Error::Checkpoint(format!("missing {}", path.display()))
        }
        _ => crate::Error::Storage(e.to_string()),
    })
}

/// Write to a hidden temp file in the same directory, then rename over `path`.
fn write_atomic(path: &Path, contents: &[u8]) -> crate::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_iteration(value: f64) -> crate::Result<u64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Ok(value as u64)
    } else {
        Err(crate::Error::Checkpoint(format!(
            "iteration counter {value} is not a non-negative integer"
        )))
    }
}
