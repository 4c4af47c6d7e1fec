//! Pre-insert duplicate checks on file name and exact text.
//!
//! Uniqueness is best-effort: the table has no constraint, so two concurrent
//! uploads can both pass the check.

use crate::naming::{sanitize_file_name, stored_file_name, KeyScheme};
use crate::{AppError, MatchMode, PairStoreClient};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How an uploaded file name is compared against stored image URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMatchPolicy {
    /// Any stored URL containing the file name is a duplicate. Timestamped
    /// keys still contain the name, but unrelated files sharing a substring
    /// (`cat.png` vs `bobcat.png`) are flagged too.
    Substring,
    /// The stored file name must equal the sanitized candidate name. The
    /// timestamp prefix is removed only for [`KeyScheme::Timestamped`] keys.
    #[default]
    ExactName,
}

impl FromStr for ImageMatchPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "substring" | "legacy" => Ok(Self::Substring),
            "exact" | "exact_name" | "exact-name" => Ok(Self::ExactName),
            other => Err(format!(
                "unknown duplicate image match '{}'; expected 'exact' or 'substring'",
                other
            )),
        }
    }
}

/// Rejects candidates whose file name or exact text is already stored.
#[derive(Clone)]
pub struct DuplicateChecker {
    client: PairStoreClient,
    policy: ImageMatchPolicy,
    key_scheme: KeyScheme,
}

impl DuplicateChecker {
    pub fn new(client: PairStoreClient, policy: ImageMatchPolicy, key_scheme: KeyScheme) -> Self {
        Self {
            client,
            policy,
            key_scheme,
        }
    }

    pub fn policy(&self) -> ImageMatchPolicy {
        self.policy
    }

    /// Run the image check, then the text check.
    ///
    /// # Errors
    /// [`AppError::DuplicateImage`] or [`AppError::DuplicateText`] on a
    /// collision; backend errors from either query propagate unchanged.
    pub async fn check(&self, file_name: &str, text: &str) -> Result<(), AppError> {
        let candidate = sanitize_file_name(file_name);
        let rows = self.client.find_by_image_name_substring(&candidate).await?;
        let image_taken = match self.policy {
            ImageMatchPolicy::Substring => !rows.is_empty(),
            ImageMatchPolicy::ExactName => rows
                .iter()
                .any(|row| stored_file_name(&row.image_url, self.key_scheme) == candidate),
        };
        if image_taken {
            tracing::info!(file_name = %candidate, policy = ?self.policy, "duplicate image rejected");
            return Err(AppError::DuplicateImage(format!(
                "An image named '{}' is already stored",
                candidate
            )));
        }

        let text_rows = self.client.find_all_by_text(text, MatchMode::Exact).await?;
        if !text_rows.is_empty() {
            tracing::info!("duplicate text rejected");
            return Err(AppError::DuplicateText(format!(
                "The text '{}' is already paired with an image",
                text
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_client;
    use crate::ImageTextPair;

    async fn seeded_checker(policy: ImageMatchPolicy) -> DuplicateChecker {
        let (client, _backend) = memory_client();
        for (path, text) in [("1700000000000_cat.png", "a cat"), ("public/dog.png", "a dog")] {
            let pair = ImageTextPair::new(client.public_url(path), text).expect("pair");
            client.insert_pair(&pair).await.expect("insert");
        }
        DuplicateChecker::new(client, policy, KeyScheme::Timestamped)
    }

    #[tokio::test]
    async fn rejects_same_file_name_under_both_policies() {
        for policy in [ImageMatchPolicy::Substring, ImageMatchPolicy::ExactName] {
            let checker = seeded_checker(policy).await;
            let err = checker
                .check("cat.png", "something new")
                .await
                .expect_err("same name must be rejected");
            assert!(matches!(err, AppError::DuplicateImage(_)), "policy: {:?}", policy);
        }
    }

    #[tokio::test]
    async fn substring_policy_flags_unrelated_names_exact_does_not() {
        let substring = seeded_checker(ImageMatchPolicy::Substring).await;
        let err = substring
            .check("at.png", "fresh text")
            .await
            .expect_err("substring collision");
        assert!(matches!(err, AppError::DuplicateImage(_)));

        let exact = seeded_checker(ImageMatchPolicy::ExactName).await;
        exact
            .check("at.png", "fresh text")
            .await
            .expect("exact name policy ignores substring collisions");
    }

    #[tokio::test]
    async fn rejects_exact_text_but_not_case_variant() {
        let checker = seeded_checker(ImageMatchPolicy::ExactName).await;
        let err = checker
            .check("bird.png", "a dog")
            .await
            .expect_err("same text must be rejected");
        assert!(matches!(err, AppError::DuplicateText(_)));

        checker
            .check("bird.png", "A Dog")
            .await
            .expect("text duplicate check is case-sensitive");
    }

    #[tokio::test]
    async fn exact_name_respects_public_key_scheme() {
        let (client, _backend) = memory_client();
        let pair = ImageTextPair::new(client.public_url("public/2024010112_x.png"), "digits")
            .expect("pair");
        client.insert_pair(&pair).await.expect("insert");

        let public = DuplicateChecker::new(
            client.clone(),
            ImageMatchPolicy::ExactName,
            KeyScheme::Public,
        );
        let err = public
            .check("2024010112_x.png", "other text")
            .await
            .expect_err("same public name must be rejected");
        assert!(matches!(err, AppError::DuplicateImage(_)));
        public
            .check("x.png", "other text")
            .await
            .expect("digit prefix belongs to the stored name");

        let timestamped =
            DuplicateChecker::new(client, ImageMatchPolicy::ExactName, KeyScheme::Timestamped);
        let err = timestamped
            .check("x.png", "other text")
            .await
            .expect_err("timestamp prefix is stripped");
        assert!(matches!(err, AppError::DuplicateImage(_)));
    }

    #[test]
    fn policy_parses_known_values() {
        assert_eq!("legacy".parse::<ImageMatchPolicy>(), Ok(ImageMatchPolicy::Substring));
        assert_eq!("EXACT".parse::<ImageMatchPolicy>(), Ok(ImageMatchPolicy::ExactName));
        assert!("fuzzy".parse::<ImageMatchPolicy>().is_err());
    }
}
