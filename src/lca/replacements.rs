//! Number of component replacements over a project's life time

/// How often a component has to be replaced within `project_life_time`
///
/// New components are installed once and replaced whenever their useful
/// life runs out before the end of the observation period. Extant
/// components are only replaced when their (possibly delayed) useful life
/// is shorter than the observation period. An unknown useful life (0)
/// yields no replacements.
pub fn number_of_replacements(
    project_life_time: u32,
    useful_life: u32,
    delay: u32,
    is_extant: bool,
) -> u32 {
    if useful_life == 0 {
        return 0;
    }

    if is_extant {
        if useful_life >= project_life_time {
            return 0;
        }
        let remaining = i64::from(project_life_time) - i64::from(delay);
        if remaining <= 0 {
            return 0;
        }
        let useful = i64::from(useful_life);
        return ((remaining + useful - 1) / useful) as u32;
    }

    if project_life_time % useful_life == 0 {
        (project_life_time / useful_life).saturating_sub(1)
    } else {
        project_life_time / useful_life
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_component_even_multiple() {
        assert_eq!(number_of_replacements(50, 25, 0, false), 1);
        assert_eq!(number_of_replacements(50, 50, 0, false), 0);
        assert_eq!(number_of_replacements(50, 1, 0, false), 49);
    }

    #[test]
    fn test_new_component_uneven_multiple() {
        assert_eq!(number_of_replacements(50, 30, 0, false), 1);
        assert_eq!(number_of_replacements(50, 80, 0, false), 0);
        assert_eq!(number_of_replacements(50, 15, 0, false), 3);
    }

    #[test]
    fn test_extant_component() {
        assert_eq!(number_of_replacements(50, 50, 10, true), 0);
        assert_eq!(number_of_replacements(50, 40, 0, true), 2);
        assert_eq!(number_of_replacements(50, 20, 10, true), 2);
        assert_eq!(number_of_replacements(50, 20, 60, true), 0);
    }

    #[test]
    fn test_unknown_life_time() {
        assert_eq!(number_of_replacements(50, 0, 0, false), 0);
        assert_eq!(number_of_replacements(50, 0, 5, true), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            .. ProptestConfig::default()
        })]

        #[test]
        fn property_replacements_never_exceed_life_time(
            life in 0u32..500,
            useful in 0u32..200,
            delay in 0u32..600,
            extant in any::<bool>(),
        ) {
            let n = number_of_replacements(life, useful, delay, extant);
            prop_assert!(n <= life);
        }

        #[test]
        fn property_longer_useful_life_never_adds_replacements(
            life in 1u32..300,
            useful in 1u32..100,
        ) {
            let shorter = number_of_replacements(life, useful, 0, false);
            let longer = number_of_replacements(life, useful + 1, 0, false);
            prop_assert!(longer <= shorter);
        }
    }
}
