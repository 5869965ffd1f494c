//! Code for reading generators and their parameters.
use super::table::{KnownIDs, fill_param_table};
use super::*;
use crate::generator::{GeneratorMap, GeneratorParameters};
use std::path::Path;

const GENERATORS_FILE_NAME: &str = "generators.csv";

/// Read generator types from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `heat_enabled` - Whether the heat module is enabled. Heat and CHP generators are only allowed
///   if it is.
pub fn read_generators(model_dir: &Path, heat_enabled: bool) -> Result<GeneratorMap> {
    let file_path = model_dir.join(GENERATORS_FILE_NAME);
    let generators: GeneratorMap = read_csv_id_file(&file_path)?;
    validate_generators(&generators, heat_enabled).with_context(|| input_err_msg(&file_path))?;

    Ok(generators)
}

fn validate_generators(generators: &GeneratorMap, heat_enabled: bool) -> Result<()> {
    for generator in generators.values() {
        check_positive(generator.lifetime, "lifetime")
            .and_then(|()| check_non_negative(generator.co2_factor, "co2_factor"))
            .and_then(|()| check_non_negative(generator.ramp_up_capacity, "ramp_up_capacity"))
            .and_then(|()| check_non_negative(generator.availability, "availability"))
            .with_context(|| format!("Invalid parameters for generator {}", generator.id))?;
        ensure!(
            heat_enabled || !generator.produces_heat(),
            "Generator {} produces heat, but the heat module is not enabled",
            generator.id
        );
    }

    Ok(())
}

/// Read cost, capacity and availability parameters for generators
pub fn read_generator_parameters(model_dir: &Path, ids: &KnownIDs) -> Result<GeneratorParameters> {
    let mut params = GeneratorParameters::default();
    fill_param_table(
        &mut params.capital_cost,
        &model_dir.join("generator_capital_costs.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.fixed_om_cost,
        &model_dir.join("generator_fixed_om_costs.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.fuel_cost,
        &model_dir.join("generator_fuel_costs.csv"),
        ids,
    )?;

    let file_path = model_dir.join("generator_efficiencies.csv");
    fill_param_table(&mut params.efficiency, &file_path, ids)?;
    for ((generator, period), efficiency) in params.efficiency.iter() {
        check_positive(efficiency, "Efficiency")
            .with_context(|| format!("Invalid efficiency for {generator} in period {period}"))
            .with_context(|| input_err_msg(&file_path))?;
    }

    fill_param_table(
        &mut params.chp_efficiency,
        &model_dir.join("generator_chp_efficiencies.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.reference_initial_capacity,
        &model_dir.join("generator_reference_initial_capacities.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.initial_capacity_scale,
        &model_dir.join("generator_initial_capacity_scales.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.initial_capacity,
        &model_dir.join("generator_initial_capacities.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.max_built_capacity,
        &model_dir.join("generator_max_built_capacities.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.max_installed_capacity,
        &model_dir.join("generator_max_installed_capacities.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.stochastic_availability,
        &model_dir.join("generator_availability.csv"),
        ids,
    )?;

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{EntityFixture, assert_error, entities, generators};
    use crate::generator::GeneratorCarrier;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    fn test_validate_generators_heat(mut generators: GeneratorMap) {
        assert!(validate_generators(&generators, false).is_ok());

        generators[0].carrier = GeneratorCarrier::Chp;
        assert!(validate_generators(&generators, true).is_ok());
        assert_error!(
            validate_generators(&generators, false),
            "Generator gas produces heat, but the heat module is not enabled"
        );
    }

    #[rstest]
    fn test_validate_generators_bad_lifetime(mut generators: GeneratorMap) {
        generators[1].lifetime = 0.0;
        assert_error!(
            validate_generators(&generators, false),
            "Invalid parameters for generator wind"
        );
    }

    #[test]
    fn test_read_generators() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(GENERATORS_FILE_NAME),
            "id,technology,lifetime,thermal,co2_factor\nGasCCGT,Gas,30,true,0.056\nWind,Wind,25,false,0\n",
        )
        .unwrap();
        let generators = read_generators(dir.path(), false).unwrap();
        assert_eq!(generators.len(), 2);
        assert!(generators["GasCCGT"].thermal);
    }

    #[rstest]
    fn test_read_generator_parameters(entities: EntityFixture) {
        let ids = entities.known_ids();
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("generator_efficiencies.csv"),
            "generator,period,value\ngas,1,0.5\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("generator_max_built_capacities.csv"),
            "node,technology,period,value\nnorth,Wind,1,100\n",
        )
        .unwrap();

        let params = read_generator_parameters(dir.path(), &ids).unwrap();
        assert_eq!(params.efficiency.get(&("gas".into(), 1)), 0.5);
        assert_eq!(params.efficiency.get(&("gas".into(), 2)), 1.0);
        assert_eq!(
            params
                .max_built_capacity
                .get(&("north".into(), "Wind".into(), 1)),
            100.0
        );
        assert_eq!(
            params
                .max_built_capacity
                .get(&("south".into(), "Wind".into(), 1)),
            500_000.0
        );
    }

    #[rstest]
    fn test_read_generator_parameters_zero_efficiency(entities: EntityFixture) {
        let ids = entities.known_ids();
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("generator_efficiencies.csv"),
            "generator,period,value\ngas,1,0\n",
        )
        .unwrap();
        assert!(read_generator_parameters(dir.path(), &ids).is_err());
    }
}
