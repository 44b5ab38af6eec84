//! Vehicle class permissions
//!
//! Edges and lanes carry a bitset of the vehicle classes allowed on them.
//! Class lists are whitespace separated names as found in plain XML files.

use bitflags::bitflags;

bitflags! {
    /// Set of vehicle classes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VehicleClasses: u32 {
        const PRIVATE = 1 << 0;
        const PUBLIC_TRANSPORT = 1 << 1;
        const PUBLIC_EMERGENCY = 1 << 2;
        const PUBLIC_AUTHORITY = 1 << 3;
        const PUBLIC_ARMY = 1 << 4;
        const VIP = 1 << 5;
        const IGNORING = 1 << 6;
        const PASSENGER = 1 << 7;
        const HOV = 1 << 8;
        const TAXI = 1 << 9;
        const BUS = 1 << 10;
        const DELIVERY = 1 << 11;
        const TRANSPORT = 1 << 12;
        const LIGHTRAIL = 1 << 13;
        const CITYRAIL = 1 << 14;
        const RAIL_SLOW = 1 << 15;
        const RAIL_FAST = 1 << 16;
        const MOTORCYCLE = 1 << 17;
        const BICYCLE = 1 << 18;
        const PEDESTRIAN = 1 << 19;
        const CUSTOM1 = 1 << 20;
        const CUSTOM2 = 1 << 21;
    }
}

const CLASS_NAMES: &[(&str, VehicleClasses)] = &[
    ("private", VehicleClasses::PRIVATE),
    ("public_transport", VehicleClasses::PUBLIC_TRANSPORT),
    ("public_emergency", VehicleClasses::PUBLIC_EMERGENCY),
    ("public_authority", VehicleClasses::PUBLIC_AUTHORITY),
    ("public_army", VehicleClasses::PUBLIC_ARMY),
    ("vip", VehicleClasses::VIP),
    ("ignoring", VehicleClasses::IGNORING),
    ("passenger", VehicleClasses::PASSENGER),
    ("hov", VehicleClasses::HOV),
    ("taxi", VehicleClasses::TAXI),
    ("bus", VehicleClasses::BUS),
    ("delivery", VehicleClasses::DELIVERY),
    ("transport", VehicleClasses::TRANSPORT),
    ("lightrail", VehicleClasses::LIGHTRAIL),
    ("cityrail", VehicleClasses::CITYRAIL),
    ("rail_slow", VehicleClasses::RAIL_SLOW),
    ("rail_fast", VehicleClasses::RAIL_FAST),
    ("motorcycle", VehicleClasses::MOTORCYCLE),
    ("bicycle", VehicleClasses::BICYCLE),
    ("pedestrian", VehicleClasses::PEDESTRIAN),
    ("custom1", VehicleClasses::CUSTOM1),
    ("custom2", VehicleClasses::CUSTOM2),
];

/// Result of parsing a class list
#[derive(Debug, Clone, PartialEq)]
pub struct ClassParse {
    pub classes: VehicleClasses,
    /// Names that did not denote a known class; they are skipped
    pub unknown: Vec<String>,
    /// Both allow and disallow were given; disallow was ignored
    pub ignored_disallow: bool,
}

impl VehicleClasses {
    /// Look up a single class by its plain XML name
    pub fn from_class_name(name: &str) -> Option<Self> {
        CLASS_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, class)| *class)
    }

    /// Class names contained in this set, in bit order
    pub fn class_names(&self) -> Vec<&'static str> {
        CLASS_NAMES
            .iter()
            .filter(|(_, class)| self.contains(*class))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Whitespace separated names, `"all"` for the full set
    pub fn to_list_string(&self) -> String {
        if self.is_all() {
            return "all".to_string();
        }
        self.class_names().join(" ")
    }
}

/// Parse a whitespace separated list of class names
pub fn parse_classes(list: &str) -> ClassParse {
    let mut classes = VehicleClasses::empty();
    let mut unknown = Vec::new();
    for name in list.split_whitespace() {
        if name == "all" {
            classes = VehicleClasses::all();
            continue;
        }
        match VehicleClasses::from_class_name(name) {
            Some(class) => classes |= class,
            None => unknown.push(name.to_string()),
        }
    }
    ClassParse {
        classes,
        unknown,
        ignored_disallow: false,
    }
}

/// Compute a permission set from allow/disallow lists.
///
/// Neither list given (or both empty) means every class may pass. A non-empty
/// allow list wins over a disallow list; otherwise the disallowed classes are
/// removed from the full set.
pub fn parse_permissions(allow: Option<&str>, disallow: Option<&str>) -> ClassParse {
    let allow = allow.unwrap_or("").trim();
    let disallow = disallow.unwrap_or("").trim();

    if allow.is_empty() && disallow.is_empty() {
        return ClassParse {
            classes: VehicleClasses::all(),
            unknown: Vec::new(),
            ignored_disallow: false,
        };
    }

    if !allow.is_empty() {
        let mut parsed = parse_classes(allow);
        parsed.ignored_disallow = !disallow.is_empty();
        return parsed;
    }

    let mut parsed = parse_classes(disallow);
    parsed.classes = parsed.classes.complement();
    parsed
}
