//! Role-driven navigation.

use crate::domain::{Role, UserProjection};

/// Entries of the main navigation bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavLink {
    Dashboard,
    Ranking,
    Missions,
    LearningTrack,
    Profile,
    ManagerArea,
}

impl NavLink {
    pub const ALL: [NavLink; 6] = [
        NavLink::Dashboard,
        NavLink::Ranking,
        NavLink::Missions,
        NavLink::LearningTrack,
        NavLink::Profile,
        NavLink::ManagerArea,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NavLink::Dashboard => "Dashboard",
            NavLink::Ranking => "Ranking",
            NavLink::Missions => "Missões",
            NavLink::LearningTrack => "Trilha de Aprendizagem",
            NavLink::Profile => "Perfil",
            NavLink::ManagerArea => "Área do Gerente",
        }
    }

    /// Links that only make sense for the user's own progress.
    fn is_personal(&self) -> bool {
        matches!(
            self,
            NavLink::Ranking | NavLink::Missions | NavLink::LearningTrack
        )
    }
}

/// Links to show for `user`.
///
/// Only managers see the manager area. A manager looking at a
/// collaborator's profile does not get the personal progress links.
/// Nothing is hidden while nobody is logged in; page protection handles that.
pub fn visible_links(user: Option<&UserProjection>, viewing_collaborator: bool) -> Vec<NavLink> {
    let role = user.map(|u| u.role);

    NavLink::ALL
        .into_iter()
        .filter(|link| match role {
            None => true,
            Some(Role::Gerente) => !(viewing_collaborator && link.is_personal()),
            Some(_) => *link != NavLink::ManagerArea,
        })
        .collect()
}

/// Display name of a role in the page header.
pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Gerente => "Gerente",
        Role::Vendedor => "Vendedor",
        Role::Estoquista => "Estoquista",
    }
}
