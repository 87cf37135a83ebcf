// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, CandidateQuery, DailyLimit, Gender, GenderPreference, GeoPoint, Match, MatchStatus,
    Mode, Photo, Preference, Profile, RadiusFilter, ScoreBreakdown, ScoredCandidate, ScoringWeights,
    Swipe, SwipeAction, UserId, UserPair,
};
pub use requests::{CardsQuery, MatchListQuery, MatchStatusQuery, SwipeRequest, UnmatchRequest, UserQuery};
pub use responses::{
    CardsResponse, ErrorResponse, HealthResponse, LikerEntry, MatchCard, MatchDetail, MatchListResponse,
    MatchOutcome, MatchSnapshot, MatchStatusResponse, PassOutcome, PublicPhoto, PublicProfile,
    QuotaEntry, QuotaStatus, SwipeOutcome, UnmatchResponse,
};
