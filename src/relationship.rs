//! Edge labels of the scene relationship graph.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relationship {
    NextTo,

    NextToChooseDirection,
    NextToChooseSide,

    NextToNorth,
    NextToEast,
    NextToSouth,
    NextToWest,
    NextToLeft,
    NextToRight,
    NextToFront,
    NextToBehind,

    OnTopOf,
    OnTopOfMiddle,
    OnTopOfEdge,
    OnTopOfFrontEdge,
    IsPartOf,
    IsPartOfMiddle,
    IsPartOfEdge,
    IsPartOfFrontEdge,

    FacingTowards,
    FacingAwayFrom,
    FacingSameDirection,
    FacingOrthogonalDirection,

    ImplicitFacingTowards,
    ImplicitFacingSameDirection,
    ImplicitFacingAwayFrom,
    ImplicitFacingOrthogonalDirection,

    PathConnectedTo,
}

impl Relationship {
    pub const ALL: [Relationship; 28] = [
        Relationship::NextTo,
        Relationship::NextToChooseDirection,
        Relationship::NextToChooseSide,
        Relationship::NextToNorth,
        Relationship::NextToEast,
        Relationship::NextToSouth,
        Relationship::NextToWest,
        Relationship::NextToLeft,
        Relationship::NextToRight,
        Relationship::NextToFront,
        Relationship::NextToBehind,
        Relationship::OnTopOf,
        Relationship::OnTopOfMiddle,
        Relationship::OnTopOfEdge,
        Relationship::OnTopOfFrontEdge,
        Relationship::IsPartOf,
        Relationship::IsPartOfMiddle,
        Relationship::IsPartOfEdge,
        Relationship::IsPartOfFrontEdge,
        Relationship::FacingTowards,
        Relationship::FacingAwayFrom,
        Relationship::FacingSameDirection,
        Relationship::FacingOrthogonalDirection,
        Relationship::ImplicitFacingTowards,
        Relationship::ImplicitFacingSameDirection,
        Relationship::ImplicitFacingAwayFrom,
        Relationship::ImplicitFacingOrthogonalDirection,
        Relationship::PathConnectedTo,
    ];

    /// Relations that make the source node a member of the target's cluster.
    pub fn is_part_of(self) -> bool {
        matches!(
            self,
            Relationship::IsPartOf
                | Relationship::IsPartOfMiddle
                | Relationship::IsPartOfEdge
                | Relationship::IsPartOfFrontEdge
        )
    }

    /// Relations that rest the source node on the target.
    pub fn is_part_of_or_on_top_of(self) -> bool {
        self.is_part_of()
            || matches!(
                self,
                Relationship::OnTopOf
                    | Relationship::OnTopOfMiddle
                    | Relationship::OnTopOfEdge
                    | Relationship::OnTopOfFrontEdge
            )
    }

    /// English phrase for the relation, `None` for implicit relations.
    pub fn expression(self) -> Option<&'static str> {
        use Relationship::*;
        Some(match self {
            NextToNorth => "north of",
            NextToSouth => "south of",
            NextToWest => "west of",
            NextToEast => "east of",
            NextTo | NextToChooseDirection => "next to",
            NextToChooseSide => "besides of",
            NextToLeft => "to the left of",
            NextToRight => "to the right of",
            NextToFront => "in front of",
            NextToBehind => "behind of",
            OnTopOf => "on top of",
            OnTopOfMiddle => "in the middle of",
            OnTopOfEdge => "on the edge of",
            OnTopOfFrontEdge => "on the front edge of",
            IsPartOf | IsPartOfMiddle | IsPartOfEdge | IsPartOfFrontEdge => "part of",
            FacingTowards => "facing",
            FacingSameDirection => "facing the same direction as",
            FacingOrthogonalDirection => "at an right angle to",
            FacingAwayFrom => "facing away from",
            PathConnectedTo => "meeting at",
            ImplicitFacingTowards
            | ImplicitFacingSameDirection
            | ImplicitFacingAwayFrom
            | ImplicitFacingOrthogonalDirection => return None,
        })
    }

    pub fn is_implicit(self) -> bool {
        self.expression().is_none()
    }

    pub fn name(self) -> &'static str {
        use Relationship::*;
        match self {
            NextTo => "NextTo",
            NextToChooseDirection => "NextToChooseDirection",
            NextToChooseSide => "NextToChooseSide",
            NextToNorth => "NextToNorth",
            NextToEast => "NextToEast",
            NextToSouth => "NextToSouth",
            NextToWest => "NextToWest",
            NextToLeft => "NextToLeft",
            NextToRight => "NextToRight",
            NextToFront => "NextToFront",
            NextToBehind => "NextToBehind",
            OnTopOf => "OnTopOf",
            OnTopOfMiddle => "OnTopOfMiddle",
            OnTopOfEdge => "OnTopOfEdge",
            OnTopOfFrontEdge => "OnTopOfFrontEdge",
            IsPartOf => "IsPartOf",
            IsPartOfMiddle => "IsPartOfMiddle",
            IsPartOfEdge => "IsPartOfEdge",
            IsPartOfFrontEdge => "IsPartOfFrontEdge",
            FacingTowards => "FacingTowards",
            FacingAwayFrom => "FacingAwayFrom",
            FacingSameDirection => "FacingSameDirection",
            FacingOrthogonalDirection => "FacingOrthogonalDirection",
            ImplicitFacingTowards => "ImplicitFacingTowards",
            ImplicitFacingSameDirection => "ImplicitFacingSameDirection",
            ImplicitFacingAwayFrom => "ImplicitFacingAwayFrom",
            ImplicitFacingOrthogonalDirection => "ImplicitFacingOrthogonalDirection",
            PathConnectedTo => "PathConnectedTo",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Relationship {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Relationship::ALL
            .iter()
            .copied()
            .find(|r| r.name() == s)
            .ok_or_else(|| Error::UnknownRelationship(s.to_string()))
    }
}
