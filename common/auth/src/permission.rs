/// A flat permission scope, e.g. `delete:movies`, bound to a marker type so
/// routes can name their requirement in the handler signature.
pub trait Permission: Send + Sync + 'static {
    const NAME: &'static str;
}

/// Declare permission marker types.
///
/// ```
/// common_auth::permissions! {
///     pub struct ReadReports => "read:reports";
/// }
/// use common_auth::Permission;
/// assert_eq!(ReadReports::NAME, "read:reports");
/// ```
#[macro_export]
macro_rules! permissions {
    ($($(#[$meta:meta])* $vis:vis struct $name:ident => $scope:literal;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            $vis struct $name;

            impl $crate::Permission for $name {
                const NAME: &'static str = $scope;
            }
        )+
    };
}
