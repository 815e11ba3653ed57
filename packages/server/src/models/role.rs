use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Villagers,  // 村人陣営
    Werewolves, // 人狼陣営
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Villager,
    Werewolf,
    WolfKing,
    Guard,
    Seer,
    Witch,
    Hunter,
    Idiot,
    Knight,
    Bear,
}

/// Which window a role acts in at night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NightAction {
    Protect,
    Kill,
    Inspect,
    Support,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathAbility {
    Shoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExileAbility {
    Reveal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayAbility {
    Duel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Passive {
    Alarm,
}

/// Capability row of the role catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSpec {
    pub team: Team,
    pub night_action: Option<NightAction>,
    pub death_ability: Option<DeathAbility>,
    pub exile_ability: Option<ExileAbility>,
    pub day_ability: Option<DayAbility>,
    pub passive: Option<Passive>,
    pub display_name: &'static str,
}

const PLAIN: RoleSpec = RoleSpec {
    team: Team::Villagers,
    night_action: None,
    death_ability: None,
    exile_ability: None,
    day_ability: None,
    passive: None,
    display_name: "Villager",
};

/// Guard, then the wolves, then the seer, then the witch. The seer and the
/// witch act after the kill is chosen because the witch is shown the victim.
pub const NIGHT_ACTING_ORDER: [NightAction; 4] = [
    NightAction::Protect,
    NightAction::Kill,
    NightAction::Inspect,
    NightAction::Support,
];

pub fn night_acting_order() -> &'static [NightAction] {
    &NIGHT_ACTING_ORDER
}

impl Role {
    pub const fn spec(self) -> RoleSpec {
        match self {
            Role::Villager => PLAIN,
            Role::Werewolf => RoleSpec {
                team: Team::Werewolves,
                night_action: Some(NightAction::Kill),
                display_name: "Werewolf",
                ..PLAIN
            },
            Role::WolfKing => RoleSpec {
                team: Team::Werewolves,
                night_action: Some(NightAction::Kill),
                death_ability: Some(DeathAbility::Shoot),
                display_name: "Wolf King",
                ..PLAIN
            },
            Role::Guard => RoleSpec {
                night_action: Some(NightAction::Protect),
                display_name: "Guard",
                ..PLAIN
            },
            Role::Seer => RoleSpec {
                night_action: Some(NightAction::Inspect),
                display_name: "Seer",
                ..PLAIN
            },
            Role::Witch => RoleSpec {
                night_action: Some(NightAction::Support),
                display_name: "Witch",
                ..PLAIN
            },
            Role::Hunter => RoleSpec {
                death_ability: Some(DeathAbility::Shoot),
                display_name: "Hunter",
                ..PLAIN
            },
            Role::Idiot => RoleSpec {
                exile_ability: Some(ExileAbility::Reveal),
                display_name: "Idiot",
                ..PLAIN
            },
            Role::Knight => RoleSpec {
                day_ability: Some(DayAbility::Duel),
                display_name: "Knight",
                ..PLAIN
            },
            Role::Bear => RoleSpec {
                passive: Some(Passive::Alarm),
                display_name: "Bear",
                ..PLAIN
            },
        }
    }

    pub fn team(self) -> Team {
        self.spec().team
    }

    pub fn night_action(self) -> Option<NightAction> {
        self.spec().night_action
    }

    pub fn death_ability(self) -> Option<DeathAbility> {
        self.spec().death_ability
    }

    pub fn exile_ability(self) -> Option<ExileAbility> {
        self.spec().exile_ability
    }

    pub fn day_ability(self) -> Option<DayAbility> {
        self.spec().day_ability
    }

    pub fn passive(self) -> Option<Passive> {
        self.spec().passive
    }

    /// Default lineup for a room that did not pick its own roles.
    pub fn default_lineup(player_count: usize) -> Vec<Role> {
        let wolves = (player_count / 4).max(1);
        let specials = ((player_count.saturating_sub(wolves)) / 2).min(5);

        let mut roles = Vec::with_capacity(player_count);
        for i in 0..wolves {
            if i == 0 && player_count >= 10 {
                roles.push(Role::WolfKing);
            } else {
                roles.push(Role::Werewolf);
            }
        }
        roles.extend(
            [Role::Seer, Role::Witch, Role::Guard, Role::Hunter, Role::Idiot]
                .into_iter()
                .take(specials),
        );
        while roles.len() < player_count {
            roles.push(Role::Villager);
        }
        roles
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec().display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn night_order_puts_kill_before_inspect_and_support() {
        let order = night_acting_order();
        let pos = |a| order.iter().position(|x| *x == a).unwrap();
        assert_eq!(pos(NightAction::Protect), 0);
        assert!(pos(NightAction::Kill) < pos(NightAction::Inspect));
        assert!(pos(NightAction::Kill) < pos(NightAction::Support));
    }

    #[test]
    fn catalog_capabilities() {
        assert_eq!(Role::WolfKing.team(), Team::Werewolves);
        assert_eq!(Role::WolfKing.death_ability(), Some(DeathAbility::Shoot));
        assert_eq!(Role::Hunter.team(), Team::Villagers);
        assert_eq!(Role::Idiot.exile_ability(), Some(ExileAbility::Reveal));
        assert_eq!(Role::Knight.day_ability(), Some(DayAbility::Duel));
        assert_eq!(Role::Bear.passive(), Some(Passive::Alarm));
        assert_eq!(Role::Villager.night_action(), None);
    }

    #[test]
    fn default_lineup_sizes() {
        for n in 3..=16 {
            let lineup = Role::default_lineup(n);
            assert_eq!(lineup.len(), n);
            let wolves = lineup.iter().filter(|r| r.team() == Team::Werewolves).count();
            assert!(wolves >= 1);
            assert!(wolves < n - wolves);
        }
    }
}
