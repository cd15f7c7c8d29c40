use serde::{Deserialize, Serialize};

/// Similarity metric used to score a query against a catalog spelling.
/// Every scorer returns a value in `[0, 1]` and `1.0` for identical input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// `2 * LCS / (len(a) + len(b))` over characters.
    #[default]
    Ratio,
    JaroWinkler,
    Levenshtein,
}

impl Scorer {
    pub fn score(self, a: &str, b: &str) -> f64 {
        let score = match self {
            Self::Ratio => ratio(a, b),
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
            Self::Levenshtein => strsim::normalized_levenshtein(a, b),
        };
        score.clamp(0.0, 1.0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ratio => "ratio",
            Self::JaroWinkler => "jaro_winkler",
            Self::Levenshtein => "levenshtein",
        }
    }
}

impl std::str::FromStr for Scorer {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ratio" => Ok(Self::Ratio),
            "jaro_winkler" | "jaro-winkler" => Ok(Self::JaroWinkler),
            "levenshtein" => Ok(Self::Levenshtein),
            other => Err(format!(
                "unsupported scorer `{other}` (expected ratio|jaro_winkler|levenshtein)"
            )),
        }
    }
}

/// Indel similarity: twice the longest common subsequence over the combined
/// length, so `milk`/`milkk` scores `8/9`.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    (2 * longest_common_subsequence(&a, &b)) as f64 / total as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for left in a {
        for (j, right) in b.iter().enumerate() {
            curr[j + 1] = if left == right { prev[j] + 1 } else { prev[j + 1].max(curr[j]) };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
