//! Unit tests for mrn-core primitives.

#[cfg(test)]
mod ids {
    use crate::{LinkId, MovementId, NodeId};

    #[test]
    fn invalid_sentinels_are_minus_one() {
        assert_eq!(NodeId::INVALID.0, -1);
        assert_eq!(LinkId::INVALID.0, -1);
        assert_eq!(MovementId::INVALID.0, -1);
    }

    #[test]
    fn validity() {
        assert!(NodeId(0).is_valid());
        assert!(NodeId(1042).is_valid());
        assert!(!NodeId::INVALID.is_valid());
        assert!(!NodeId(-7).is_valid());
    }

    #[test]
    fn default_is_invalid() {
        assert_eq!(LinkId::default(), LinkId::INVALID);
    }

    #[test]
    fn ordering() {
        assert!(NodeId(100) > NodeId(99));
        assert!(LinkId::INVALID < LinkId(0));
    }

    #[test]
    fn display() {
        assert_eq!(NodeId(7).to_string(), "NodeId(7)");
        assert_eq!(MovementId::INVALID.to_string(), "MovementId(-1)");
    }

    #[test]
    fn meso_id_arithmetic() {
        // Mesoscopic node IDs encode provenance.
        let macro_node = NodeId(42);
        let meso = NodeId(macro_node.0 * 100 + 3);
        assert_eq!(meso, NodeId(4203));
    }
}

#[cfg(test)]
mod types {
    use crate::{
        AgentType, BoundaryType, CellType, ControlType, DirectionType, LinkType,
        MovementCompositeType, MovementType,
    };

    #[test]
    fn display_strings() {
        assert_eq!(ControlType::Signal.to_string(), "signal");
        assert_eq!(ControlType::NotSignal.to_string(), "common");
        assert_eq!(BoundaryType::IncomeOnly.to_string(), "income_only");
        assert_eq!(CellType::LaneChange.to_string(), "lane_change");
        assert_eq!(AgentType::Bike.to_string(), "bike");
        assert_eq!(LinkType::LivingStreet.to_string(), "living_street");
    }

    #[test]
    fn link_type_defaults() {
        assert_eq!(LinkType::Motorway.default_lanes(), 4);
        assert_eq!(LinkType::Secondary.default_lanes(), 2);
        assert_eq!(LinkType::Trunk.default_speed(), 100.0);
        assert_eq!(LinkType::Connector.default_capacity(), 9999);
        assert_eq!(LinkType::Undefined.default_lanes(), -1);
    }

    #[test]
    fn composite_from_parts() {
        assert_eq!(
            MovementCompositeType::from_parts(DirectionType::NB, MovementType::Thru),
            MovementCompositeType::NBT,
        );
        assert_eq!(
            MovementCompositeType::from_parts(DirectionType::SB, MovementType::Left),
            MovementCompositeType::SBL,
        );
        assert_eq!(
            MovementCompositeType::from_parts(DirectionType::WB, MovementType::UTurn),
            MovementCompositeType::WBU,
        );
    }

    #[test]
    fn composite_display() {
        assert_eq!(MovementCompositeType::EBR.to_string(), "EBR");
        assert_eq!(MovementCompositeType::Undefined.to_string(), "undefined");
    }
}
