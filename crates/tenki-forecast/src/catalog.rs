//! JMA area catalog: forecast centers and the offices under them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// The `area.json` document. Sections other than centers and offices are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaCatalog {
    #[serde(default)]
    pub centers: BTreeMap<String, CenterInfo>,
    #[serde(default)]
    pub offices: BTreeMap<String, OfficeInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterInfo {
    #[serde(default)]
    pub name: String,
    pub en_name: Option<String>,
    pub office_name: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeInfo {
    #[serde(default)]
    pub name: String,
    pub en_name: Option<String>,
    pub parent: Option<String>,
    pub office_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    Center,
    Office,
}

impl AreaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Office => "office",
        }
    }
}

impl FromStr for AreaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "center" => Ok(Self::Center),
            "office" => Ok(Self::Office),
            other => Err(format!("unknown area type: {}", other)),
        }
    }
}

/// One row of the persisted area catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub area_code: String,
    pub area_name: String,
    pub area_name_en: Option<String>,
    pub area_type: Option<AreaType>,
    /// Center code for offices
    pub parent_code: Option<String>,
    pub office_name: Option<String>,
}

/// A center and the offices listed as its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CenterNode {
    pub code: String,
    pub name: String,
    pub offices: Vec<Area>,
}

/// Center → offices index built once per catalog load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionIndex {
    pub centers: Vec<CenterNode>,
}

impl RegionIndex {
    pub fn center(&self, code: &str) -> Option<&CenterNode> {
        self.centers.iter().find(|c| c.code == code)
    }

    /// Look up an office anywhere in the index.
    pub fn office(&self, code: &str) -> Option<&Area> {
        self.centers
            .iter()
            .flat_map(|c| c.offices.iter())
            .find(|o| o.area_code == code)
    }

    pub fn office_count(&self) -> usize {
        self.centers.iter().map(|c| c.offices.len()).sum()
    }
}

impl AreaCatalog {
    /// Parse a raw `area.json` document.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Every center and office as catalog rows, centers first.
    pub fn areas(&self) -> Vec<Area> {
        let centers = self.centers.iter().map(|(code, info)| Area {
            area_code: code.clone(),
            area_name: info.name.clone(),
            area_name_en: info.en_name.clone(),
            area_type: Some(AreaType::Center),
            parent_code: None,
            office_name: info.office_name.clone(),
        });
        let offices = self.offices.iter().map(|(code, info)| office_area(code, info));

        centers.chain(offices).collect()
    }

    /// Build the center → offices index.
    ///
    /// Offices appear in the center's `children` order. Children missing
    /// from `offices` are skipped, and centers left with no offices are
    /// omitted.
    pub fn index(&self) -> RegionIndex {
        let centers = self
            .centers
            .iter()
            .filter_map(|(code, center)| {
                let offices: Vec<Area> = center
                    .children
                    .iter()
                    .filter_map(|child| {
                        self.offices
                            .get(child)
                            .map(|info| office_area(child, info))
                    })
                    .collect();

                if offices.is_empty() {
                    return None;
                }
                Some(CenterNode {
                    code: code.clone(),
                    name: center.name.clone(),
                    offices,
                })
            })
            .collect();

        RegionIndex { centers }
    }
}

fn office_area(code: &str, info: &OfficeInfo) -> Area {
    Area {
        area_code: code.to_string(),
        area_name: info.name.clone(),
        area_name_en: info.en_name.clone(),
        area_type: Some(AreaType::Office),
        parent_code: info.parent.clone(),
        office_name: info.office_name.clone(),
    }
}
