use crate::{
    body::Body,
    config::{Strategy, SystemConfig},
    system::GravitySystem,
    vector::Vector2,
};

fn strategy_from_raw(raw: u32) -> Option<Strategy> {
    match raw {
        0 => Some(Strategy::BruteForce),
        1 => Some(Strategy::BarnesHut),
        2 => Some(Strategy::SingleAggregate),
        _ => None,
    }
}

/// Creates a system with default configuration.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn GravitySystem_Create() -> *mut GravitySystem {
    Box::into_raw(Box::new(GravitySystem::default()))
}

/// Creates a system from a subset of the configuration. Returns null if the
/// values are rejected.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn GravitySystem_CreateWithConfig(
    gravitational_constant: f64,
    min_distance_squared_floor: f64,
    dt: f64,
    iterations_per_tick: usize,
    opening_angle_theta: f64,
    strategy: u32,
) -> *mut GravitySystem {
    let Some(strategy) = strategy_from_raw(strategy) else {
        log::warn!("unknown strategy id {strategy}");
        return std::ptr::null_mut();
    };

    let config = SystemConfig {
        gravitational_constant,
        min_distance_squared_floor,
        dt,
        iterations_per_tick,
        opening_angle_theta,
        strategy,
        ..Default::default()
    };

    match GravitySystem::new(config) {
        Ok(system) => Box::into_raw(Box::new(system)),
        Err(e) => {
            log::warn!("rejected configuration: {e}");
            std::ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn GravitySystem_Destroy(handle: *mut GravitySystem) {
    if !handle.is_null() {
        unsafe { drop(Box::from_raw(handle)) };
    }
}

/// Returns false if the tick was abandoned.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn GravitySystem_Advance(handle: *mut GravitySystem) -> bool {
    match unsafe { handle.as_mut() } {
        Some(system) => system.advance().is_ok(),
        None => false,
    }
}

/// Returns false if the body is rejected.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn GravitySystem_AddBody(
    handle: *mut GravitySystem,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    mass: f64,
) -> bool {
    let Some(system) = (unsafe { handle.as_mut() }) else {
        return false;
    };

    let body = Body::new(Vector2::new(x, y), Vector2::new(vx, vy), mass);
    match system.add(body) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("rejected body: {e}");
            false
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn GravitySystem_SetStrategy(handle: *mut GravitySystem, strategy: u32) -> bool {
    match (unsafe { handle.as_mut() }, strategy_from_raw(strategy)) {
        (Some(system), Some(strategy)) => {
            system.set_strategy(strategy);
            true
        }
        _ => false,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn GravitySystem_GetBodyCount(handle: *const GravitySystem) -> usize {
    unsafe { handle.as_ref() }.map_or(0, |system| system.len())
}

/// Pointer to `GetBodyCount` contiguous bodies, valid until the next mutating call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn GravitySystem_GetBodies(handle: *const GravitySystem) -> *const Body {
    unsafe { handle.as_ref() }.map_or(std::ptr::null(), |system| system.bodies().as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn GravitySystem_ApplyImpulse(
    handle: *mut GravitySystem,
    x: f64,
    y: f64,
    ix: f64,
    iy: f64,
    radius: f64,
) -> usize {
    unsafe { handle.as_mut() }.map_or(0, |system| {
        system.apply_impulse(Vector2::new(x, y), radius, Vector2::new(ix, iy))
    })
}
