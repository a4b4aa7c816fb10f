use anyhow::{anyhow, bail, Context, Result};
use cfs_rs::filter::{FilterTrainer, RankMode};
use cfs_rs::signal::Signal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use std::{env, iter};

/// Interpreter used when `PYTHON` is unset.
const DEFAULT_PYTHON_BIN: &str = "python3";

/// Largest coefficient deviation from the NumPy reference that still passes.
const PARITY_MAX_ABS: f64 = 1e-8;

const PY_OTSDF_SCRIPT: &str = r#"
import json
import sys
import time
import numpy as np

env = json.loads(sys.stdin.read())
iters = int(env["iters"])
p = env["payload"]
shape = tuple(p["shape"])

def _signals(key):
    return [np.asarray(v, dtype=float).reshape(shape) for v in p[key]]

auth = _signals("authentic")
imp = _signals("impostor")

def _compute():
    X = [np.fft.fftn(x) for x in auth + imp]
    na = len(auth)
    d_a = np.mean([np.abs(x) ** 2 for x in X[:na]], axis=0)
    d_m = np.mean([np.abs(x) ** 2 for x in X[na:]], axis=0) if imp else np.zeros(shape)
    T = p["alpha"] * d_a + p["beta"] * d_m + p["gamma"]
    n = len(X)
    d = float(np.prod(shape))
    A = np.array([[np.sum(np.conj(X[i]) * X[j] / T) for j in range(n)] for i in range(n)])
    u = np.array([d] * na + [0.0] * (n - na), dtype=complex)
    lam, V = np.linalg.eigh(A)
    keep = lam > p["eig_cutoff"] * lam.max()
    Vk = V[:, keep]
    c = Vk @ ((Vk.conj().T @ u) / lam[keep])
    H = sum(ci * xi for ci, xi in zip(c, X)) / T
    return np.real(np.fft.ifftn(H))

y = np.asarray(_compute(), dtype=float).reshape(-1)

t0 = time.perf_counter_ns()
for _ in range(iters):
    _compute()
t1 = time.perf_counter_ns()

print(json.dumps({
    "output": y.tolist(),
    "avg_ns": (t1 - t0) / max(iters, 1),
    "python_version": sys.version.split()[0],
    "numpy_version": np.__version__
}))
"#;

#[derive(Debug, Deserialize)]
struct NumpyReference {
    output: Vec<f64>,
    avg_ns: f64,
    python_version: String,
    numpy_version: String,
}

/// How closely the trained coefficients track the NumPy reference.
#[derive(Debug, Serialize, Clone, Copy)]
struct Agreement {
    pearson_r: f64,
    mae: f64,
    rmse: f64,
    max_abs: f64,
}

impl Agreement {
    fn measure(case_id: &str, trained: &[f64], reference: &[f64]) -> Result<Self> {
        if trained.len() != reference.len() || trained.is_empty() {
            bail!(
                "{case_id}: trained filter has {} coefficients, reference has {}",
                trained.len(),
                reference.len()
            );
        }
        let n = trained.len() as f64;
        let mean_t = trained.iter().sum::<f64>() / n;
        let mean_r = reference.iter().sum::<f64>() / n;
        let (mut abs_sum, mut sq_sum, mut max_abs) = (0.0, 0.0, 0.0f64);
        let (mut cov, mut var_t, mut var_r) = (0.0, 0.0, 0.0);
        for (&t, &r) in iter::zip(trained, reference) {
            let err = t - r;
            abs_sum += err.abs();
            sq_sum += err * err;
            max_abs = max_abs.max(err.abs());
            cov += (t - mean_t) * (r - mean_r);
            var_t += (t - mean_t) * (t - mean_t);
            var_r += (r - mean_r) * (r - mean_r);
        }
        let pearson_r = if var_t > 0.0 && var_r > 0.0 {
            cov / (var_t * var_r).sqrt()
        } else if trained == reference {
            1.0
        } else {
            0.0
        };
        Ok(Self {
            pearson_r,
            mae: abs_sum / n,
            rmse: (sq_sum / n).sqrt(),
            max_abs,
        })
    }
}

#[derive(Debug, Serialize, Clone)]
struct ParityRow {
    case_id: String,
    rank_mode: String,
    rank: usize,
    constraints: usize,
    #[serde(flatten)]
    agreement: Agreement,
    rust_ns: f64,
    python_ns: f64,
}

#[derive(Debug, Serialize)]
struct ParityBundle {
    generated_epoch_seconds: u64,
    python_executable: String,
    python_version: String,
    numpy_version: String,
    rows: Vec<ParityRow>,
}

/// One training scenario shared by the Rust trainer and the NumPy reference.
struct ParityCase {
    case_id: &'static str,
    shape: Vec<usize>,
    authentic: Vec<Vec<f64>>,
    impostor: Vec<Vec<f64>>,
    alpha: f64,
    beta: f64,
    gamma: f64,
    rank_mode: RankMode,
}

impl ParityCase {
    fn bins(&self) -> usize {
        self.shape.iter().product()
    }

    fn constraints(&self) -> usize {
        self.authentic.len() + self.impostor.len()
    }

    /// Relative eigenvalue cutoff the Rust solve applies in this mode.
    fn eig_cutoff(&self) -> f64 {
        match self.rank_mode {
            RankMode::Full => f64::EPSILON * (self.constraints() * self.bins()) as f64,
            RankMode::Reduced => f64::EPSILON.sqrt(),
        }
    }
}

fn main() -> Result<()> {
    match env::args().nth(1).as_deref() {
        Some("parity") => run_parity(),
        _ => {
            eprintln!("Usage:");
            eprintln!("  cargo run -p xtask -- parity");
            eprintln!("Set PYTHON to choose the interpreter (default {DEFAULT_PYTHON_BIN}).");
            Ok(())
        }
    }
}

fn run_parity() -> Result<()> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let out_dir = PathBuf::from(format!("target/parity/{ts}"));
    fs::create_dir_all(&out_dir).context("creating parity output directory")?;

    let python_bin = env::var_os("PYTHON")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON_BIN));
    let mut rows = Vec::new();
    let mut versions = None;

    for case in reference_cases() {
        let mut trainer = build_trainer(&case)?;
        let rust_ns = time_training(&mut trainer, 20)
            .with_context(|| format!("{}: timing training", case.case_id))?;
        let filter = trainer
            .train()
            .map_err(|e| anyhow!("{} training failed: {e}", case.case_id))?;
        let trained = filter.coefficients().iter().copied().collect::<Vec<_>>();

        let reference = numpy_reference(&python_bin, &case, 5)?;
        rows.push(ParityRow {
            case_id: case.case_id.to_string(),
            rank_mode: case.rank_mode.to_string(),
            rank: filter.rank(),
            constraints: filter.diagnostics().constraints,
            agreement: Agreement::measure(case.case_id, &trained, &reference.output)?,
            rust_ns,
            python_ns: reference.avg_ns,
        });
        versions.get_or_insert((reference.python_version, reference.numpy_version));
    }

    let (python_version, numpy_version) = versions.unwrap_or_default();
    let bundle = ParityBundle {
        generated_epoch_seconds: ts,
        python_executable: python_bin.to_string_lossy().into_owned(),
        python_version,
        numpy_version,
        rows,
    };
    fs::write(
        out_dir.join("summary.json"),
        serde_json::to_vec_pretty(&bundle).context("serializing parity summary")?,
    )
    .context("writing summary.json")?;
    write_summary_csv(&out_dir.join("summary.csv"), &bundle.rows)?;

    println!("Parity artifacts in {}", out_dir.display());
    for row in &bundle.rows {
        println!(
            "  - {} ({}): rank {}/{}, max_abs {:.3e}, r {:.9}",
            row.case_id,
            row.rank_mode,
            row.rank,
            row.constraints,
            row.agreement.max_abs,
            row.agreement.pearson_r
        );
    }

    let failing = bundle
        .rows
        .iter()
        .filter(|row| !(row.agreement.max_abs <= PARITY_MAX_ABS))
        .map(|row| row.case_id.as_str())
        .collect::<Vec<_>>();
    if !failing.is_empty() {
        bail!("parity exceeded {PARITY_MAX_ABS:e} for: {}", failing.join(", "));
    }
    Ok(())
}

fn build_trainer(case: &ParityCase) -> Result<FilterTrainer<f64>> {
    let mut trainer = FilterTrainer::new(case.alpha, case.beta, case.gamma)?;
    trainer.set_rank_mode(case.rank_mode == RankMode::Full);
    for values in &case.authentic {
        let signal = Signal::from_shape_vec(&case.shape, values.clone())?;
        trainer
            .try_add_auth(&signal)
            .with_context(|| format!("{}: authentic example rejected", case.case_id))?;
    }
    for values in &case.impostor {
        let signal = Signal::from_shape_vec(&case.shape, values.clone())?;
        trainer
            .try_add_imp(&signal)
            .with_context(|| format!("{}: impostor example rejected", case.case_id))?;
    }
    Ok(trainer)
}

fn reference_cases() -> Vec<ParityCase> {
    let boxcar = vec![
        0., 0., 0., 0., 0., 1., 1., 1., 1., 1., 0., 0., 0., 0., 0.,
    ];
    let x = pattern(16, 16, 1.0, 0.3);
    let doubled = x.iter().map(|v| 2.0 * v).collect::<Vec<_>>();
    vec![
        ParityCase {
            case_id: "boxcar_1d_full",
            shape: vec![15],
            authentic: vec![boxcar],
            impostor: vec![],
            alpha: 1e-5,
            beta: 1.0 - 1e-5,
            gamma: 0.5,
            rank_mode: RankMode::Full,
        },
        ParityCase {
            case_id: "image_2d_full",
            shape: vec![24, 20],
            authentic: (0..3)
                .map(|k| pattern(24, 20, 1.0 + k as f64, 0.1 * k as f64))
                .collect(),
            impostor: (0..2)
                .map(|k| pattern(24, 20, 5.5 + k as f64, 1.7))
                .collect(),
            alpha: 0.2,
            beta: 0.7,
            gamma: 0.1,
            rank_mode: RankMode::Full,
        },
        ParityCase {
            case_id: "image_2d_reduced",
            shape: vec![16, 16],
            authentic: vec![x, doubled, pattern(16, 16, 3.0, 0.9)],
            impostor: vec![pattern(16, 16, 7.0, 2.2)],
            alpha: 1e-5,
            beta: 1.0 - 1e-5,
            gamma: 0.5,
            rank_mode: RankMode::Reduced,
        },
    ]
}

/// Smooth synthetic image, row-major.
fn pattern(rows: usize, cols: usize, freq: f64, phase: f64) -> Vec<f64> {
    (0..rows * cols)
        .map(|n| {
            let (i, j) = ((n / cols) as f64, (n % cols) as f64);
            (freq * i / rows as f64 * 6.0 + phase).sin() * (0.7 * freq * j / cols as f64 * 6.0).cos()
                + 0.05 * (i - j)
        })
        .collect()
}

/// Mean wall time of one `train()` over `iters` runs, in nanoseconds.
fn time_training(trainer: &mut FilterTrainer<f64>, iters: u32) -> Result<f64> {
    let start = Instant::now();
    for _ in 0..iters {
        trainer.train().map_err(|e| anyhow!("{e}"))?;
    }
    Ok(start.elapsed().as_nanos() as f64 / f64::from(iters.max(1)))
}

/// Run the NumPy closed form on `case` and read back its coefficients.
fn numpy_reference(python_bin: &Path, case: &ParityCase, iters: usize) -> Result<NumpyReference> {
    let payload = json!({
        "iters": iters,
        "payload": {
            "shape": case.shape,
            "authentic": case.authentic,
            "impostor": case.impostor,
            "alpha": case.alpha,
            "beta": case.beta,
            "gamma": case.gamma,
            "eig_cutoff": case.eig_cutoff(),
        }
    });
    let mut child = Command::new(python_bin)
        .arg("-c")
        .arg(PY_OTSDF_SCRIPT)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning python interpreter at {}", python_bin.display()))?;
    child
        .stdin
        .take()
        .context("opening python stdin")?
        .write_all(&serde_json::to_vec(&payload).context("serializing python payload")?)
        .context("writing payload to python stdin")?;

    let output = child
        .wait_with_output()
        .context("waiting for python process")?;
    if !output.status.success() {
        bail!(
            "{}: numpy reference failed: {}",
            case.case_id,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    serde_json::from_slice(&output.stdout)
        .with_context(|| format!("{}: parsing numpy reference output", case.case_id))
}

fn write_summary_csv(path: &Path, rows: &[ParityRow]) -> Result<()> {
    let mut out = String::from(
        "case_id,rank_mode,rank,constraints,pearson_r,mae,rmse,max_abs,rust_ns,python_ns\n",
    );
    for row in rows {
        let a = &row.agreement;
        out.push_str(&format!(
            "{},{},{},{},{:.12},{:.12},{:.12},{:.12},{:.3},{:.3}\n",
            row.case_id,
            row.rank_mode,
            row.rank,
            row.constraints,
            a.pearson_r,
            a.mae,
            a.rmse,
            a.max_abs,
            row.rust_ns,
            row.python_ns
        ));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agreement_of_identical_and_shifted_outputs() {
        let a = [0.5, -1.0, 2.0, 0.25];
        let same = Agreement::measure("same", &a, &a).expect("same length");
        assert_eq!(same.max_abs, 0.0);
        assert!((same.pearson_r - 1.0).abs() < 1e-12);

        let shifted = a.map(|v| v + 0.1);
        let off = Agreement::measure("shifted", &a, &shifted).expect("same length");
        assert!((off.max_abs - 0.1).abs() < 1e-12);
        assert!((off.rmse - 0.1).abs() < 1e-12);
        assert!((off.pearson_r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn agreement_rejects_mismatched_lengths() {
        assert!(Agreement::measure("short", &[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn full_mode_cutoff_scales_with_problem_size() {
        let case = &reference_cases()[1];
        assert_eq!(case.bins(), 24 * 20);
        assert_eq!(case.constraints(), 5);
        assert_eq!(case.eig_cutoff(), f64::EPSILON * (5 * 24 * 20) as f64);
    }
}
