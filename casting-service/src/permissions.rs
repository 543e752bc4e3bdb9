//! Permission scopes granted by the identity provider for this API.

common_auth::permissions! {
    pub struct GetMovies => "get:movies";
    pub struct PostMovies => "post:movies";
    pub struct PatchMovies => "patch:movies";
    pub struct DeleteMovies => "delete:movies";
    pub struct GetActors => "get:actors";
    pub struct PostActors => "post:actors";
    pub struct PatchActors => "patch:actors";
    pub struct DeleteActors => "delete:actors";
}
