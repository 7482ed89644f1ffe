use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The three mandatory proof points of a service visit, in visit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStage {
    Before,
    During,
    After,
}

impl EvidenceStage {
    pub const ALL: [EvidenceStage; 3] = [
        EvidenceStage::Before,
        EvidenceStage::During,
        EvidenceStage::After,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceStage::Before => "before",
            EvidenceStage::During => "during",
            EvidenceStage::After => "after",
        }
    }
}

impl fmt::Display for EvidenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EvidenceStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(EvidenceStage::Before),
            "during" => Ok(EvidenceStage::During),
            "after" => Ok(EvidenceStage::After),
            other => Err(format!("Unknown evidence stage: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_order_by_visit() {
        let mut stages = vec![EvidenceStage::After, EvidenceStage::Before, EvidenceStage::During];
        stages.sort();
        assert_eq!(stages, EvidenceStage::ALL.to_vec());
    }

    #[test]
    fn parse_accepts_any_case() {
        assert_eq!("DURING".parse::<EvidenceStage>(), Ok(EvidenceStage::During));
        assert!("halfway".parse::<EvidenceStage>().is_err());
    }
}
