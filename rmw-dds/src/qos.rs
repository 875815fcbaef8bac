//! ROS QoS profiles, their validity check and their translation into reader attributes.

use std::fmt;

use crate::error::{Result, RmwError};
use crate::transport::{
    DurabilityKind, HistoryKind, LivelinessKind, ReaderAttributes, ReliabilityKind,
    TransportDuration,
};

pub const DEFAULT_HISTORY_DEPTH: usize = 10;

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub enum QosReliability {
    SystemDefault,
    #[default]
    Reliable,
    BestEffort,
    Unknown,
}

impl fmt::Display for QosReliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemDefault => write!(f, "System Default"),
            Self::Reliable => write!(f, "Reliable"),
            Self::BestEffort => write!(f, "Best Effort"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum QosHistory {
    SystemDefault,
    KeepLast(usize),
    KeepAll,
    Unknown,
}

impl Default for QosHistory {
    fn default() -> Self {
        Self::KeepLast(DEFAULT_HISTORY_DEPTH)
    }
}

impl QosHistory {
    /// Keep-last history; a depth of zero selects the default depth.
    pub fn from_depth(depth: usize) -> Self {
        if depth == 0 {
            Self::KeepLast(DEFAULT_HISTORY_DEPTH)
        } else {
            Self::KeepLast(depth)
        }
    }
}

impl fmt::Display for QosHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemDefault => write!(f, "System Default"),
            Self::KeepLast(depth) => write!(f, "Keep Last ({})", depth),
            Self::KeepAll => write!(f, "Keep All"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub enum QosDurability {
    SystemDefault,
    TransientLocal,
    #[default]
    Volatile,
    Unknown,
}

impl fmt::Display for QosDurability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemDefault => write!(f, "System Default"),
            Self::TransientLocal => write!(f, "Transient Local"),
            Self::Volatile => write!(f, "Volatile"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub enum QosLiveliness {
    SystemDefault,
    #[default]
    Automatic,
    ManualByNode,
    ManualByTopic,
    Unknown,
}

impl fmt::Display for QosLiveliness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemDefault => write!(f, "System Default"),
            Self::Automatic => write!(f, "Automatic"),
            Self::ManualByNode => write!(f, "Manual by Node"),
            Self::ManualByTopic => write!(f, "Manual by Topic"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Represents a duration in seconds and nanoseconds
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub struct Duration {
    pub sec: u64,
    pub nsec: u64,
}

impl Duration {
    pub const INFINITE: Duration = Duration {
        sec: 9223372036,
        nsec: 854775807,
    };

    pub const ZERO: Duration = Duration { sec: 0, nsec: 0 };

    /// Zero and infinite both mean "no bound".
    pub fn is_unspecified(&self) -> bool {
        *self == Self::INFINITE || *self == Self::ZERO
    }

    fn to_transport(self) -> TransportDuration {
        if self.is_unspecified() {
            return None;
        }
        std::time::Duration::from_secs(self.sec)
            .checked_add(std::time::Duration::from_nanos(self.nsec))
    }

    fn from_transport(d: TransportDuration) -> Self {
        match d {
            None => Self::INFINITE,
            Some(d) => Self {
                sec: d.as_secs(),
                nsec: u64::from(d.subsec_nanos()),
            },
        }
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::INFINITE
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INFINITE {
            write!(f, "Infinite")
        } else if self.nsec == 0 {
            write!(f, "{}s", self.sec)
        } else {
            write!(f, "{}s {}ns", self.sec, self.nsec)
        }
    }
}

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub struct QosProfile {
    pub reliability: QosReliability,
    pub durability: QosDurability,
    pub history: QosHistory,
    pub deadline: Duration,
    pub lifespan: Duration,
    pub liveliness: QosLiveliness,
    pub liveliness_lease_duration: Duration,
    /// Use the topic name as the DDS topic name, without the ROS prefix.
    pub avoid_ros_namespace_conventions: bool,
}

impl fmt::Display for QosProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QoS({}, {}, {}",
            self.reliability, self.durability, self.history
        )?;
        if self.deadline != Duration::INFINITE {
            write!(f, ", deadline={}", self.deadline)?;
        }
        if self.lifespan != Duration::INFINITE {
            write!(f, ", lifespan={}", self.lifespan)?;
        }
        if self.liveliness != QosLiveliness::Automatic {
            write!(f, ", liveliness={}", self.liveliness)?;
        }
        if self.liveliness_lease_duration != Duration::INFINITE {
            write!(f, ", lease={}", self.liveliness_lease_duration)?;
        }
        if self.avoid_ros_namespace_conventions {
            write!(f, ", raw names")?;
        }
        write!(f, ")")
    }
}

impl QosProfile {
    pub fn sensor_data() -> Self {
        Self {
            reliability: QosReliability::BestEffort,
            history: QosHistory::KeepLast(5),
            ..Default::default()
        }
    }

    pub fn system_default() -> Self {
        Self {
            reliability: QosReliability::SystemDefault,
            durability: QosDurability::SystemDefault,
            history: QosHistory::SystemDefault,
            liveliness: QosLiveliness::SystemDefault,
            ..Default::default()
        }
    }
}

/// Rejects profiles the transport cannot honour at all.
pub fn is_valid_qos(qos: &QosProfile) -> Result<()> {
    if qos.liveliness == QosLiveliness::ManualByNode {
        return Err(RmwError::configuration(
            "MANUAL_BY_NODE liveliness is not supported",
        ));
    }
    Ok(())
}

/// Writes the policies of `qos` over the transport defaults held in `attributes`.
///
/// `SystemDefault` leaves the transport default untouched; `Unknown` policies and
/// depths beyond the transport's range are errors.
pub fn get_datareader_qos(qos: &QosProfile, attributes: &mut ReaderAttributes) -> Result<()> {
    match qos.reliability {
        QosReliability::SystemDefault => {}
        QosReliability::Reliable => attributes.reliability = ReliabilityKind::Reliable,
        QosReliability::BestEffort => attributes.reliability = ReliabilityKind::BestEffort,
        QosReliability::Unknown => {
            return Err(RmwError::configuration("unknown QoS reliability policy"));
        }
    }

    match qos.durability {
        QosDurability::SystemDefault => {}
        QosDurability::TransientLocal => attributes.durability = DurabilityKind::TransientLocal,
        QosDurability::Volatile => attributes.durability = DurabilityKind::Volatile,
        QosDurability::Unknown => {
            return Err(RmwError::configuration("unknown QoS durability policy"));
        }
    }

    if !qos.deadline.is_unspecified() {
        attributes.deadline = qos.deadline.to_transport();
    }
    if !qos.lifespan.is_unspecified() {
        attributes.lifespan = qos.lifespan.to_transport();
    }

    match qos.liveliness {
        QosLiveliness::SystemDefault => {}
        QosLiveliness::Automatic => attributes.liveliness = LivelinessKind::Automatic,
        QosLiveliness::ManualByTopic => attributes.liveliness = LivelinessKind::ManualByTopic,
        QosLiveliness::ManualByNode => {
            return Err(RmwError::configuration(
                "MANUAL_BY_NODE liveliness is not supported",
            ));
        }
        QosLiveliness::Unknown => {
            return Err(RmwError::configuration("unknown QoS liveliness policy"));
        }
    }
    if !qos.liveliness_lease_duration.is_unspecified() {
        attributes.liveliness_lease_duration = qos.liveliness_lease_duration.to_transport();
    }

    match qos.history {
        QosHistory::SystemDefault | QosHistory::KeepLast(0) => {}
        QosHistory::KeepLast(depth) => {
            let depth = u32::try_from(depth)
                .ok()
                .filter(|d| *d <= i32::MAX as u32)
                .ok_or_else(|| {
                    RmwError::configuration(format!(
                        "history depth {depth} exceeds the transport limit"
                    ))
                })?;
            attributes.history = HistoryKind::KeepLast(depth);
        }
        QosHistory::KeepAll => attributes.history = HistoryKind::KeepAll,
        QosHistory::Unknown => {
            return Err(RmwError::configuration("unknown QoS history policy"));
        }
    }

    Ok(())
}

/// Rebuilds the profile a reader actually runs with.
pub fn profile_from_reader_attributes(
    attributes: &ReaderAttributes,
    avoid_ros_namespace_conventions: bool,
) -> QosProfile {
    QosProfile {
        reliability: match attributes.reliability {
            ReliabilityKind::Reliable => QosReliability::Reliable,
            ReliabilityKind::BestEffort => QosReliability::BestEffort,
        },
        durability: match attributes.durability {
            DurabilityKind::TransientLocal => QosDurability::TransientLocal,
            DurabilityKind::Volatile => QosDurability::Volatile,
        },
        history: match attributes.history {
            HistoryKind::KeepLast(depth) => QosHistory::KeepLast(depth as usize),
            HistoryKind::KeepAll => QosHistory::KeepAll,
        },
        deadline: Duration::from_transport(attributes.deadline),
        lifespan: Duration::from_transport(attributes.lifespan),
        liveliness: match attributes.liveliness {
            LivelinessKind::Automatic => QosLiveliness::Automatic,
            LivelinessKind::ManualByParticipant => QosLiveliness::ManualByNode,
            LivelinessKind::ManualByTopic => QosLiveliness::ManualByTopic,
        },
        liveliness_lease_duration: Duration::from_transport(attributes.liveliness_lease_duration),
        avoid_ros_namespace_conventions,
    }
}
