// Integration tests for pool configuration defaults and validation.

use taskpool::error::PoolError;
use taskpool::PoolConfig;

#[test]
fn test_config_defaults() {
    let config = PoolConfig::default();

    assert_eq!(config.pool_size, num_cpus::get());
    assert_eq!(config.max_units, num_cpus::get() * 2);
    assert!(!config.return_unit_id);
    assert!(config.validate().is_ok());
}

#[test]
fn test_fixed_config_has_no_growth_headroom() {
    let config = PoolConfig::fixed(4);

    assert_eq!(config.pool_size, 4);
    assert_eq!(config.max_units, 4);
    assert!(config.validate().is_ok());
}

#[test]
fn test_with_unit_ids() {
    let config = PoolConfig::fixed(1).with_unit_ids();
    assert!(config.return_unit_id);
}

#[test]
fn test_zero_capacity_is_rejected() {
    let config = PoolConfig::new(0, 0);
    assert!(matches!(
        config.validate(),
        Err(PoolError::InvalidConfig(_))
    ));
}

#[test]
fn test_pool_size_above_capacity_is_rejected() {
    let config = PoolConfig::new(3, 2);
    let err = config.validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid configuration: pool_size (3) exceeds max_units (2)"
    );
}

#[test]
fn test_config_debug_format() {
    let config = PoolConfig::default();
    assert!(format!("{:?}", config).contains("pool_size"));
    assert!(format!("{:?}", config).contains("max_units"));
}
