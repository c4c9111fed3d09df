//! DEFINER clause removal for replayed view/trigger/routine definitions.

use regex::Regex;

use super::Grammar;

impl Grammar {
    /// Strips `DEFINER=`user`@`host`` after the leading verb list when it
    /// names the session's logged user (the host may also be `%`).
    ///
    /// Definitions by other users, or a session without a user, are returned
    /// unchanged.
    #[must_use]
    pub fn remove_definer(&self, query: &str) -> String {
        let Some(user) = self.session().user.as_deref() else {
            return query.to_string();
        };
        let definer = match user.split_once('@') {
            Some((name, host)) => format!(
                "`{}`@`(?:%|{})`",
                regex::escape(name),
                regex::escape(host)
            ),
            None => format!("`{}`", regex::escape(user)),
        };
        match Regex::new(&format!("^([A-Z =]+) DEFINER={definer}")) {
            Ok(pattern) => pattern.replace(query, "$1").into_owned(),
            Err(_) => query.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::MySqlDialect;
    use crate::grammar::{Grammar, Session};

    fn grammar(user: &str) -> Grammar {
        Grammar::new(MySqlDialect::new()).with_session(Session::new().user(user))
    }

    #[test]
    fn test_remove_own_definer() {
        let sql = "CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER VIEW `v` AS SELECT 1";
        assert_eq!(
            grammar("root@localhost").remove_definer(sql),
            "CREATE ALGORITHM=UNDEFINED SQL SECURITY DEFINER VIEW `v` AS SELECT 1"
        );
    }

    #[test]
    fn test_remove_wildcard_host() {
        let sql = "CREATE DEFINER=`app`@`%` TRIGGER `t` BEFORE INSERT ON `x` FOR EACH ROW SET @a = 1";
        assert_eq!(
            grammar("app@10.0.0.1").remove_definer(sql),
            "CREATE TRIGGER `t` BEFORE INSERT ON `x` FOR EACH ROW SET @a = 1"
        );
    }

    #[test]
    fn test_other_definer_is_kept() {
        let sql = "CREATE DEFINER=`admin`@`localhost` PROCEDURE `p`() SELECT 1";
        assert_eq!(grammar("root@localhost").remove_definer(sql), sql);
    }

    #[test]
    fn test_without_user_is_unchanged() {
        let sql = "CREATE DEFINER=`root`@`localhost` VIEW v AS SELECT 1";
        assert_eq!(Grammar::new(MySqlDialect::new()).remove_definer(sql), sql);
    }
}
