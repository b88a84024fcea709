use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelQuality {
    High,
    Medium,
    Low,
}

impl ModelQuality {
    #[must_use]
    pub fn from_plddt(plddt: f64) -> Self {
        if plddt >= 70.0 {
            Self::High
        } else if plddt >= 50.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Summary statistics of one PDB model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStats {
    pub atom_count: usize,
    pub residue_count: usize,
    /// Mean B-factor of all atoms on the 0..100 pLDDT scale.
    pub mean_plddt: f64,
    pub quality: ModelQuality,
}

/// Read atom and residue counts plus confidence from `ATOM`/`HETATM`
/// records. ESMFold stores pLDDT in the B-factor column, either as 0..1
/// or 0..100.
#[must_use]
pub fn model_stats(text: &str) -> ModelStats {
    let mut residues = HashSet::new();
    let mut b_factors = Vec::new();
    let mut atom_count = 0;

    for line in text.lines() {
        if !(line.starts_with("ATOM") || line.starts_with("HETATM")) {
            continue;
        }
        atom_count += 1;

        // chain id, residue number and insertion code (columns 22-27)
        if let Some(key) = line.get(21..27) {
            residues.insert(key.to_string());
        }

        if let Some(b) = line.get(60..66).and_then(|s| s.trim().parse::<f64>().ok()) {
            b_factors.push(b);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = if b_factors.is_empty() {
        0.0
    } else {
        b_factors.iter().sum::<f64>() / b_factors.len() as f64
    };
    let mean_plddt = super::fasta::round2(if mean <= 1.0 { mean * 100.0 } else { mean });

    ModelStats {
        atom_count,
        residue_count: residues.len(),
        mean_plddt,
        quality: ModelQuality::from_plddt(mean_plddt),
    }
}
