use chrono::DateTime;
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};

const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    /// Epoch seconds, rendered as a UTC timestamp.
    #[serde(serialize_with = "serialize_release_date")]
    pub release_date: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub age: u32,
    pub gender: String,
}

fn serialize_release_date<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match DateTime::from_timestamp(*value, 0) {
        Some(ts) => serializer.serialize_str(&ts.format(RELEASE_DATE_FORMAT).to_string()),
        None => Err(S::Error::custom(format!("release_date {value} is out of range"))),
    }
}

/// Release dates must be representable as a calendar timestamp.
pub fn release_date_in_range(secs: i64) -> bool {
    DateTime::from_timestamp(secs, 0).is_some()
}

#[derive(Debug, Default, Deserialize)]
pub struct NewMovie {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub release_date: Option<i64>,
}

impl NewMovie {
    pub fn into_movie(self) -> Option<Movie> {
        Some(Movie {
            id: self.id?,
            title: self.title?,
            release_date: self.release_date?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub release_date: Option<i64>,
}

impl MoviePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.release_date.is_none()
    }

    pub fn apply(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(release_date) = self.release_date {
            movie.release_date = release_date;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NewActor {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
}

impl NewActor {
    pub fn into_actor(self) -> Option<Actor> {
        Some(Actor {
            id: self.id?,
            name: self.name?,
            age: self.age?,
            gender: self.gender?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ActorPatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
}

impl ActorPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.gender.is_none()
    }

    pub fn apply(self, actor: &mut Actor) {
        if let Some(name) = self.name {
            actor.name = name;
        }
        if let Some(age) = self.age {
            actor.age = age;
        }
        if let Some(gender) = self.gender {
            actor.gender = gender;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn movie_release_date_renders_as_utc_timestamp() {
        let movie = Movie { id: 1, title: "DDLJ".into(), release_date: 21_233_421 };
        let value = serde_json::to_value(&movie).expect("serialize");
        assert_eq!(value, json!({ "id": 1, "title": "DDLJ", "release_date": "1970-09-03 18:10:21" }));
    }

    #[test]
    fn release_date_range_matches_serialization() {
        assert!(release_date_in_range(0));
        assert!(release_date_in_range(-86_400));
        assert!(!release_date_in_range(i64::MAX));

        let movie = Movie { id: 1, title: "Far".into(), release_date: i64::MAX };
        assert!(serde_json::to_value(&movie).is_err());
    }

    #[test]
    fn new_movie_requires_every_field() {
        let partial = NewMovie { id: Some(3), title: Some("Hope".into()), release_date: None };
        assert!(partial.into_movie().is_none());

        let full = NewMovie { id: Some(3), title: Some("Hope".into()), release_date: Some(999_120_312) };
        assert_eq!(full.into_movie().map(|m| m.id), Some(3));
    }

    #[test]
    fn actor_patch_only_touches_present_fields() {
        let mut actor = Actor { id: 1, name: "SRK".into(), age: 54, gender: "Male".into() };
        let patch = ActorPatch { age: Some(55), ..Default::default() };
        assert!(!patch.is_empty());
        patch.apply(&mut actor);
        assert_eq!(actor, Actor { id: 1, name: "SRK".into(), age: 55, gender: "Male".into() });
        assert!(ActorPatch::default().is_empty());
    }
}
