use super::config::Capabilities;
use std::collections::BTreeMap;

const AVERAGE_PARAMETERS: [&str; 3] = ["cellBAverage", "n_ave", "v_ave"];

/// Writable cell output parameters and which of them the run selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSelection {
    parameters: BTreeMap<&'static str, bool>,
}

impl OutputSelection {
    pub fn new(capabilities: &Capabilities, selection: &str) -> Self {
        let mut names = vec![
            "faceB",
            "faceJ",
            "cellRhoQi",
            "cellB",
            "cellJ",
            "cellUe",
            "cellJi",
            "nodeE",
            "nodeB",
            "nodeJ",
            "nodeUe",
            "nodeJi",
            "counterCellMaxUe",
            "counterCellMaxVi",
            "counterCellMinRhoQi",
            "prod_rate_iono",
            "prod_rate_exo",
            "cellBAverage",
            "n_ave",
            "v_ave",
            "cellDivB",
            "cellNPles",
            "cellB0",
            "n",
            "T",
            "v",
            "n_tot",
            "T_tot",
            "v_tot",
        ];
        if capabilities.resistivity {
            names.push("nodeEta");
        }
        if capabilities.ecut {
            names.push("counterNodeEcut");
        }

        let mut parameters: BTreeMap<&'static str, bool> =
            names.into_iter().map(|name| (name, false)).collect();
        for token in selection.split_whitespace() {
            if let Some(selected) = parameters.get_mut(token) {
                *selected = true;
            }
        }
        Self { parameters }
    }

    pub fn available(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parameters.keys().copied()
    }

    pub fn selected(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parameters
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(name, _)| *name)
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.parameters.get(name).copied().unwrap_or(false)
    }

    /// Selections that have no effect under the given capabilities.
    pub fn warnings(&self, capabilities: &Capabilities) -> Vec<String> {
        let mut warnings = Vec::new();
        if !capabilities.population_averages
            && AVERAGE_PARAMETERS.iter().any(|name| self.is_selected(name))
        {
            warnings.push(
                "average output parameters selected but population averages are disabled"
                    .to_string(),
            );
        }
        if !capabilities.constant_b && self.is_selected("cellB0") {
            warnings.push(
                "cellB0 output parameter selected but constant magnetic field is disabled"
                    .to_string(),
            );
        }
        warnings
    }
}
