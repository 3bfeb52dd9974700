use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

/// (title, genres, release year, baseline rating)
const MOVIES: &[(&str, &str, i64, f64)] = &[
    ("Toy Story (1995)", "Animation|Children's|Comedy", 1995, 4.1),
    ("Heat (1995)", "Action|Crime|Thriller", 1995, 3.9),
    ("Babe (1995)", "Children's|Comedy|Drama", 1995, 3.6),
    ("Fargo (1996)", "Crime|Drama|Thriller", 1996, 4.2),
    ("Scream (1996)", "Horror|Thriller", 1996, 3.3),
    ("Titanic (1997)", "Drama|Romance", 1997, 3.6),
    ("Men in Black (1997)", "Action|Adventure|Comedy|Sci-Fi", 1997, 3.7),
    ("Saving Private Ryan (1998)", "Action|Drama|War", 1998, 4.3),
    ("Rushmore (1998)", "Comedy", 1998, 3.9),
    ("The Matrix (1999)", "Action|Sci-Fi|Thriller", 1999, 4.3),
    ("American Beauty (1999)", "Comedy|Drama", 1999, 4.3),
    ("Gladiator (2000)", "Action|Drama", 2000, 4.0),
    ("Chicken Run (2000)", "Animation|Children's|Comedy", 2000, 3.9),
    ("Untitled Short (2000)", "", 2000, 3.0),
];

const GENDERS: &[&str] = &["F", "M"];

const OCCUPATIONS: &[&str] = &[
    "academic/educator",
    "artist",
    "clerical/admin",
    "college/grad student",
    "customer service",
    "doctor/health care",
    "executive/managerial",
    "farmer",
    "homemaker",
    "K-12 student",
    "lawyer",
    "programmer",
    "retired",
    "sales/marketing",
    "scientist",
    "self-employed",
    "technician/engineer",
    "tradesman/craftsman",
    "unemployed",
    "writer",
    "other or not specified",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let out_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/movie_ratings.csv"));
    let n_ratings: usize = 5_000;
    let mut rng = SimpleRng::new(42);

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("creating {}", out_path.display()))?;
    writer.write_record(["title", "genres", "rating", "age", "gender", "occupation", "year"])?;

    for _ in 0..n_ratings {
        let (title, genres, year, baseline) = *rng.pick(MOVIES);
        let age = rng.gauss(32.0, 11.0).clamp(1.0, 80.0).round() as i64;
        let rating = rng.gauss(baseline, 0.9).round().clamp(1.0, 5.0) as i64;
        let gender = *rng.pick(GENDERS);
        let occupation = *rng.pick(OCCUPATIONS);

        writer.write_record([
            title.to_string(),
            genres.to_string(),
            rating.to_string(),
            age.to_string(),
            gender.to_string(),
            occupation.to_string(),
            year.to_string(),
        ])?;
    }
    writer.flush().context("flushing CSV")?;

    info!("wrote {n_ratings} ratings to {}", out_path.display());
    println!("Wrote {n_ratings} ratings to {}", out_path.display());
    Ok(())
}
