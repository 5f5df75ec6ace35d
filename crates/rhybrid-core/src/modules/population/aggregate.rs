use super::model::Population;
use crate::domain::{HybridError, HybridResult};

pub const EXCLUDED_TAG: &str = "-";
pub const RESERVED_TAG: &str = "tot";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputVariableGroup {
    pub tag: String,
    pub members: Vec<usize>,
}

/// Output variables built from the populations' output tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputVariables {
    pub groups: Vec<OutputVariableGroup>,
    /// Group of each population; `None` for excluded ones.
    pub variable_index: Vec<Option<usize>>,
    pub excluded: Vec<usize>,
    pub plasma_members: Vec<usize>,
}

impl OutputVariables {
    pub fn aggregate(populations: &[Population], declared_count: usize) -> HybridResult<Self> {
        let mut variables = Self::default();

        for (index, population) in populations.iter().enumerate() {
            if population.include_in_plasma {
                variables.plasma_members.push(index);
            }
            if population.output_tag == RESERVED_TAG {
                return Err(HybridError::configuration(
                    "CONFIG.OUTPUT_TAG",
                    format!(
                        "particle species cannot have output_str = {RESERVED_TAG} ({})",
                        population.name
                    ),
                ));
            }
            if population.output_tag == EXCLUDED_TAG {
                variables.variable_index.push(None);
                variables.excluded.push(index);
                continue;
            }

            let group = match variables
                .groups
                .iter()
                .position(|group| group.tag == population.output_tag)
            {
                Some(group) => group,
                None => {
                    variables.groups.push(OutputVariableGroup {
                        tag: population.output_tag.clone(),
                        members: Vec::new(),
                    });
                    variables.groups.len() - 1
                }
            };
            variables.groups[group].members.push(index);
            variables.variable_index.push(Some(group));
        }

        variables.check(populations.len(), declared_count)?;
        Ok(variables)
    }

    pub fn count(&self) -> usize {
        self.groups.len()
    }

    fn check(&self, population_count: usize, declared_count: usize) -> HybridResult<()> {
        let mut tags: Vec<&str> = self.groups.iter().map(|group| group.tag.as_str()).collect();
        tags.sort_unstable();
        tags.dedup();

        let consistent = declared_count == population_count
            && population_count == self.variable_index.len()
            && self.count() <= population_count
            && self.plasma_members.len() <= population_count
            && tags.len() == self.groups.len();
        if consistent {
            Ok(())
        } else {
            Err(HybridError::consistency(
                "CONSISTENCY.POPULATIONS",
                format!(
                    "something went wrong in particle list initialization (declared {declared_count}, constructed {population_count}, indexed {}, groups {})",
                    self.variable_index.len(),
                    self.count()
                ),
            ))
        }
    }

    pub fn summary_lines(&self, populations: &[Population]) -> Vec<String> {
        let names = |indices: &[usize]| {
            indices
                .iter()
                .filter_map(|index| populations.get(*index))
                .map(|population| population.name.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        };

        let mut lines: Vec<String> = self
            .groups
            .iter()
            .map(|group| format!("{}: {}", group.tag, names(&group.members)))
            .collect();
        lines.push(format!("{EXCLUDED_TAG}: {}", names(&self.excluded)));
        lines.push(format!(
            "tot plasma (snapshot): {}",
            names(&self.plasma_members)
        ));
        lines.push(format!(
            "tot plasma (average): {}",
            self.groups
                .iter()
                .map(|group| group.tag.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        ));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::OutputVariables;
    use crate::domain::HybridErrorCategory;
    use crate::modules::population::{Population, PopulationCategory};

    fn population(name: &str, tag: &str) -> Population {
        Population {
            name: name.to_string(),
            category: PopulationCategory::Exosphere,
            charge: 1.6e-19,
            mass: 1.67e-27,
            density: 0.0,
            velocity: 0.0,
            vth: 0.0,
            output_tag: tag.to_string(),
            include_in_plasma: true,
        }
    }

    #[test]
    fn shared_tags_form_one_group_and_dash_is_excluded() {
        let populations = vec![
            population("A", "ion"),
            population("B", "ion"),
            population("C", "-"),
        ];
        let variables =
            OutputVariables::aggregate(&populations, 3).expect("aggregation should succeed");

        assert_eq!(variables.count(), 1);
        assert_eq!(variables.groups[0].tag, "ion");
        assert_eq!(variables.groups[0].members, vec![0, 1]);
        assert_eq!(variables.variable_index, vec![Some(0), Some(0), None]);
        assert_eq!(variables.excluded, vec![2]);
        assert_eq!(
            variables.summary_lines(&populations),
            vec![
                "ion: A B".to_string(),
                "-: C".to_string(),
                "tot plasma (snapshot): A B C".to_string(),
                "tot plasma (average): ion".to_string(),
            ]
        );
    }

    #[test]
    fn groups_and_exclusions_partition_population_indices() {
        let populations = vec![
            population("p0", "sw"),
            population("p1", "-"),
            population("p2", "planet"),
            population("p3", "sw"),
            population("p4", "-"),
        ];
        let variables =
            OutputVariables::aggregate(&populations, 5).expect("aggregation should succeed");

        let mut covered: Vec<usize> = variables
            .groups
            .iter()
            .flat_map(|group| group.members.iter().copied())
            .chain(variables.excluded.iter().copied())
            .collect();
        covered.sort_unstable();
        assert_eq!(covered, (0..5).collect::<Vec<_>>());
        assert_eq!(
            variables
                .groups
                .iter()
                .map(|group| group.tag.as_str())
                .collect::<Vec<_>>(),
            vec!["sw", "planet"]
        );
    }

    #[test]
    fn reserved_total_tag_is_rejected() {
        let populations = vec![population("A", "ion"), population("T", "tot")];
        let error = OutputVariables::aggregate(&populations, 2)
            .expect_err("tot tag should be rejected");
        assert_eq!(error.category(), HybridErrorCategory::ConfigurationError);
        assert!(error.message().contains("(T)"));
    }

    #[test]
    fn declared_count_mismatch_is_a_consistency_error() {
        let populations = vec![population("A", "ion")];
        let error = OutputVariables::aggregate(&populations, 2)
            .expect_err("mismatched counts should fail");
        assert_eq!(error.category(), HybridErrorCategory::ConsistencyError);
        assert_eq!(error.exit_code(), 6);
    }

    #[test]
    fn no_populations_yield_no_groups() {
        let variables = OutputVariables::aggregate(&[], 0).expect("empty input should succeed");
        assert_eq!(variables.count(), 0);
        assert!(variables.variable_index.is_empty());
    }
}
