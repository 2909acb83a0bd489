//! In-memory CAN motor bus.
//!
//! Devices keep what the firmware would: last demand, inversion and who they
//! follow. A follower's applied output is its leader's applied output.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use ddb_core::utils::{
    controllers::{CanId, HardwareError, MotorBus, MotorController, MotorFamily},
    OperatorInput,
};
use tracing::{debug, warn};

#[derive(Debug, Default, Clone)]
struct Device {
    family: Option<MotorFamily>,
    demand: f32,
    inverted: bool,
    leader: Option<CanId>,
}

#[derive(Debug, Default)]
struct BusState {
    devices: BTreeMap<CanId, Device>,
    offline: Vec<CanId>,
}

impl BusState {
    fn device(
        &mut self,
        id: CanId,
    ) -> Result<&mut Device, HardwareError> {
        if self.offline.contains(&id) {
            return Err(HardwareError::Unavailable { id });
        }
        self.devices.get_mut(&id).ok_or(HardwareError::Unavailable { id })
    }

    fn applied(
        &self,
        id: CanId,
        depth: usize,
    ) -> f32 {
        match self.devices.get(&id) {
            Some(Device {
                leader: Some(leader),
                ..
            }) if depth < 8 => self.applied(*leader, depth + 1),
            Some(dev) if dev.inverted => -dev.demand,
            Some(dev) => dev.demand,
            None => 0.0,
        }
    }
}

/// Shared handle to the simulated bus; clones see the same devices.
#[derive(Clone, Default)]
pub struct SimBus {
    state: Rc<RefCell<BusState>>,
}

impl SimBus {
    /// A bus on which every ID in `offline` never answers.
    pub fn new(offline: impl IntoIterator<Item = u8>) -> Self {
        let bus = Self::default();
        bus.state
            .borrow_mut()
            .offline
            .extend(offline.into_iter().map(CanId));
        bus
    }

    /// Make `id` stop answering from now on.
    pub fn disconnect(
        &self,
        id: CanId,
    ) {
        warn!(%id, "simulated controller dropped off the bus");
        self.state.borrow_mut().offline.push(id);
    }

    /// Output the motor behind `id` is actually running at.
    pub fn applied(
        &self,
        id: CanId,
    ) -> f32 {
        self.state.borrow().applied(id, 0)
    }
}

impl MotorBus for SimBus {
    type Motor = SimMotor;

    fn open(
        &mut self,
        family: MotorFamily,
        id: CanId,
    ) -> Result<SimMotor, HardwareError> {
        let mut state = self.state.borrow_mut();
        if state.offline.contains(&id) {
            return Err(HardwareError::Unavailable { id });
        }
        let dev = state.devices.entry(id).or_default();
        dev.family = Some(family);
        debug!(%id, %family, "opened controller");
        Ok(SimMotor {
            id,
            state: self.state.clone(),
        })
    }
}

/// Handle to one simulated controller.
pub struct SimMotor {
    id: CanId,
    state: Rc<RefCell<BusState>>,
}

impl SimMotor {
    fn with_device(
        &self,
        f: impl FnOnce(&mut Device),
    ) -> Result<(), HardwareError> {
        let mut state = self.state.borrow_mut();
        f(state.device(self.id)?);
        Ok(())
    }
}

impl MotorController for SimMotor {
    fn id(&self) -> CanId {
        self.id
    }

    fn set_output(
        &mut self,
        value: f32,
    ) -> Result<(), HardwareError> {
        if !(-1.0..=1.0).contains(&value) {
            return Err(HardwareError::Rejected { id: self.id });
        }
        self.with_device(|d| d.demand = value)
    }

    fn set_inverted(
        &mut self,
        inverted: bool,
    ) -> Result<(), HardwareError> {
        self.with_device(|d| d.inverted = inverted)
    }

    fn follow(
        &mut self,
        leader: &Self,
    ) -> Result<(), HardwareError> {
        let leader = leader.id;
        self.with_device(|d| d.leader = Some(leader))
    }

    fn restore_factory_defaults(&mut self) -> Result<(), HardwareError> {
        self.with_device(|d| {
            let family = d.family;
            *d = Device {
                family,
                ..Device::default()
            };
        })
    }

    fn check_health(&self) -> Result<(), HardwareError> {
        self.state.borrow_mut().device(self.id).map(|_| ())
    }
}

/// Joystick held at a fixed position for the whole teleop period.
#[derive(Debug, Clone, Copy)]
pub struct HeldStick {
    y: f32,
    x: f32,
}

impl HeldStick {
    pub fn new(
        y: f32,
        x: f32,
    ) -> Self {
        Self {
            y: y.clamp(-1.0, 1.0),
            x: x.clamp(-1.0, 1.0),
        }
    }
}

impl OperatorInput for HeldStick {
    fn axis_y(&self) -> f32 {
        self.y
    }

    fn axis_x(&self) -> f32 {
        self.x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follower_mirrors_inverted_leader() {
        let mut bus = SimBus::default();
        let mut leader = bus.open(MotorFamily::SparkMaxNeo, CanId(7)).unwrap();
        let mut follower = bus.open(MotorFamily::SparkMaxNeo, CanId(8)).unwrap();
        follower.follow(&leader).unwrap();
        leader.set_inverted(true).unwrap();
        leader.set_output(0.4).unwrap();
        assert_eq!(bus.applied(CanId(7)), -0.4);
        assert_eq!(bus.applied(CanId(8)), -0.4);
    }

    #[test]
    fn disconnected_controller_stops_answering() {
        let mut bus = SimBus::new([9]);
        assert!(bus.open(MotorFamily::SparkMaxNeo, CanId(9)).is_err());

        let mut m = bus.open(MotorFamily::SparkMaxNeo, CanId(4)).unwrap();
        m.set_output(0.2).unwrap();
        bus.disconnect(CanId(4));
        assert_eq!(
            m.set_output(0.3),
            Err(HardwareError::Unavailable { id: CanId(4) })
        );
        assert_eq!(bus.applied(CanId(4)), 0.2);
    }

    #[test]
    fn dropped_follower_faults_its_side() {
        use ddb_core::utils::{
            controllers::{DriveError, Side},
            DriveController, RobotConfig,
        };

        let mut bus = SimBus::default();
        let mut ctrl = DriveController::init(&RobotConfig::default(), &mut bus).unwrap();
        ctrl.on_teleop_tick(0.6, 0.0).unwrap();
        assert!(bus.applied(CanId(8)) != 0.0);

        bus.disconnect(CanId(8));
        assert_eq!(
            ctrl.on_teleop_tick(0.6, 0.0),
            Err(DriveError::SideFaulted {
                side: Side::Right,
                source: HardwareError::Unavailable { id: CanId(8) },
            })
        );
        assert_eq!(bus.applied(CanId(7)), 0.0);
        assert_eq!(bus.applied(CanId(9)), 0.0);
        assert_eq!(bus.applied(CanId(4)), 0.0);
    }
}
