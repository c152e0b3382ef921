//! Login state on top of a session handle.

use crate::session::Session;

use super::error::{ConceptError, ConceptResult};
use super::store::ObjectId;

/// Stateless rules over [`Session`]; the session store owns the state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sessioning;

impl Sessioning {
    pub fn start(&self, session: &Session, user: &ObjectId) -> ConceptResult<()> {
        self.is_logged_out(session)?;
        session.start(user.as_str());
        Ok(())
    }

    pub fn end(&self, session: &Session) -> ConceptResult<()> {
        self.is_logged_in(session)?;
        session.end();
        Ok(())
    }

    pub fn get_user(&self, session: &Session) -> ConceptResult<ObjectId> {
        self.is_logged_in(session)?;
        match session.user() {
            Some(user) => ObjectId::parse(&user),
            None => Err(not_logged_in()),
        }
    }

    pub fn is_logged_in(&self, session: &Session) -> ConceptResult<()> {
        match session.user() {
            Some(_) => Ok(()),
            None => Err(not_logged_in()),
        }
    }

    pub fn is_logged_out(&self, session: &Session) -> ConceptResult<()> {
        match session.user() {
            Some(_) => Err(ConceptError::NotAllowed("Must be logged out!".into())),
            None => Ok(()),
        }
    }
}

fn not_logged_in() -> ConceptError {
    ConceptError::Unauthenticated("Must be logged in!".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_logout() {
        let sessioning = Sessioning;
        let session = Session::new("s1");
        let user = ObjectId::new();

        assert!(matches!(
            sessioning.get_user(&session),
            Err(ConceptError::Unauthenticated(_))
        ));
        assert!(sessioning.end(&session).is_err());

        sessioning.start(&session, &user).unwrap();
        assert_eq!(sessioning.get_user(&session).unwrap(), user);
        assert_eq!(
            sessioning.start(&session, &user),
            Err(ConceptError::NotAllowed("Must be logged out!".into()))
        );

        sessioning.end(&session).unwrap();
        assert!(sessioning.is_logged_out(&session).is_ok());
    }
}
