//! Pairs passenger requests with driver intents.
//!
//! Candidates are filtered on seats, route geometry (detour and direction)
//! and time-window overlap, then ranked by detour, driver rating and intent
//! age. Accepting a match reserves seats on its intent under both locks.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::pricing::FareSchedule;
use crate::constants::*;
use crate::error::{Result, RideError};
use crate::models::{
    DomainEvent, DriverIntent, DriverProfile, DriverStatus, IntentStatus, MatchDecision,
    MatchStatus, Recurrence, RideMatch, RideRequest, Role, Session,
};
use crate::store::Store;
use crate::utils::geo::{detour_km, haversine_km, preserves_direction};
use crate::utils::Clock;

#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub max_detour_km: f64,
    pub min_time_overlap: Duration,
    /// Length of the pickup window that opens at an intent's start time.
    pub intent_window: Duration,
    /// Tolerance either side of the requested time.
    pub request_flex: Duration,
    pub pending_ttl: Duration,
    pub timezone: Tz,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_detour_km: DEFAULT_MAX_DETOUR_KM,
            min_time_overlap: Duration::minutes(DEFAULT_MIN_TIME_OVERLAP_MINUTES),
            intent_window: Duration::minutes(DEFAULT_INTENT_WINDOW_MINUTES),
            request_flex: Duration::minutes(DEFAULT_REQUEST_FLEX_MINUTES),
            pending_ttl: Duration::seconds(DEFAULT_MATCH_PENDING_TTL_SECS),
            timezone: chrono_tz::Asia::Kolkata,
        }
    }
}

/// An intent that passed the eligibility filter, with what it was ranked on.
#[derive(Debug, Clone)]
struct Candidate {
    intent: DriverIntent,
    driver_name: String,
    driver: DriverProfile,
    detour_km: f64,
}

#[derive(Clone)]
pub struct MatchingEngine {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    config: MatchingConfig,
    fares: FareSchedule,
}

impl MatchingEngine {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, config: MatchingConfig, fares: FareSchedule) -> Self {
        Self {
            store,
            clock,
            config,
            fares,
        }
    }

    /// Produces ranked `pending` candidates for a passenger request.
    pub async fn request_ride(
        &self,
        session: &Session,
        request: RideRequest,
    ) -> Result<(Vec<RideMatch>, Vec<DomainEvent>)> {
        let passenger_count = validate_request(&request)?;
        if session.role != Role::Passenger {
            return Err(RideError::Forbidden("switch to the passenger role to request rides".into()));
        }
        let account = self
            .store
            .accounts
            .snapshot(session.user_id)
            .await
            .ok_or_else(|| RideError::not_found("user", session.user_id))?;
        if account.passenger.is_none() {
            return Err(RideError::Forbidden("user has no passenger profile".into()));
        }

        let now = self.clock.now();
        let mut candidates = Vec::new();
        for intent in self
            .store
            .intents
            .select(|intent| intent.status == IntentStatus::Active)
            .await
        {
            if intent.driver_user_id == session.user_id {
                continue;
            }
            if let Some(candidate) = self.evaluate(&intent, &request, passenger_count, now).await {
                candidates.push(candidate);
            }
        }

        if candidates.is_empty() {
            warn!(
                "No intent can take {} passenger(s) {} -> {}",
                passenger_count, request.pickup.label, request.drop.label
            );
            return Err(RideError::NoCapacity(format!(
                "no driver can take {} passenger(s) from {} to {}",
                passenger_count, request.pickup.label, request.drop.label
            )));
        }
        rank(&mut candidates);

        let request_id = Uuid::new_v4();
        let distance_km = haversine_km(request.pickup.point, request.drop.point);
        let estimated_fare = self.fares.fare(distance_km, passenger_count)?;

        let mut matches = Vec::with_capacity(candidates.len());
        let mut events = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let ride_match = RideMatch {
                id: Uuid::new_v4(),
                request_id,
                intent_id: candidate.intent.id,
                driver_user_id: candidate.intent.driver_user_id,
                passenger_user_id: session.user_id,
                status: MatchStatus::Pending,
                pickup: request.pickup.clone(),
                drop: request.drop.clone(),
                passenger_count,
                requested_time: request.requested_time,
                distance_km,
                detour_km: candidate.detour_km,
                estimated_fare,
                driver_name: candidate.driver_name,
                vehicle_model: candidate.driver.vehicle_model,
                vehicle_number: candidate.driver.vehicle_number,
                driver_rating: candidate.driver.rating,
                created_at: now,
                expires_at: now + self.config.pending_ttl,
                decided_at: None,
            };
            self.store.matches.insert(ride_match.id, ride_match.clone()).await;

            events.push(DomainEvent::MatchProposed {
                match_id: ride_match.id,
                driver_user_id: ride_match.driver_user_id,
                passenger_user_id: ride_match.passenger_user_id,
                pickup: ride_match.pickup.label.clone(),
                drop: ride_match.drop.label.clone(),
                passenger_count,
                fare: estimated_fare,
            });
            matches.push(ride_match);
        }

        info!(
            "Request {} produced {} candidate(s), fare estimate {}",
            request_id,
            matches.len(),
            estimated_fare
        );
        Ok((matches, events))
    }

    async fn evaluate(
        &self,
        intent: &DriverIntent,
        request: &RideRequest,
        passenger_count: u32,
        now: DateTime<Utc>,
    ) -> Option<Candidate> {
        if intent.available_seats < passenger_count {
            debug!("Intent {} skipped: {} seat(s) left", intent.id, intent.available_seats);
            return None;
        }

        let account = self.store.accounts.snapshot(intent.driver_user_id).await?;
        let driver = account.driver?;
        if driver.status != DriverStatus::Active || !driver.license_valid_at(now) {
            debug!("Intent {} skipped: driver unavailable", intent.id);
            return None;
        }

        let (start, end) = (intent.start.point, intent.end.point);
        if !preserves_direction(start, request.pickup.point, request.drop.point) {
            debug!("Intent {} skipped: request runs against the route", intent.id);
            return None;
        }
        let detour = detour_km(start, end, request.pickup.point, request.drop.point);
        if detour > self.config.max_detour_km {
            debug!("Intent {} skipped: detour {:.2} km", intent.id, detour);
            return None;
        }

        let occurrence = occurrence_near(intent, request.requested_time, self.config.timezone)?;
        let overlap = window_overlap(
            occurrence,
            occurrence + self.config.intent_window,
            request.requested_time - self.config.request_flex,
            request.requested_time + self.config.request_flex,
        );
        if overlap < self.config.min_time_overlap {
            debug!("Intent {} skipped: {} min overlap", intent.id, overlap.num_minutes());
            return None;
        }

        Some(Candidate {
            intent: intent.clone(),
            driver_name: account.user.name,
            driver,
            detour_km: detour,
        })
    }

    /// Accepts or rejects a pending match on behalf of either party.
    pub async fn decide(
        &self,
        session: &Session,
        match_id: Uuid,
        decision: MatchDecision,
    ) -> Result<(RideMatch, Vec<DomainEvent>)> {
        let row = self
            .store
            .matches
            .get(match_id)
            .await
            .ok_or_else(|| RideError::not_found("match", match_id))?;

        let mut events = Vec::new();
        let decided = {
            let mut ride_match = row.lock().await;
            if session.user_id != ride_match.driver_user_id && session.user_id != ride_match.passenger_user_id {
                return Err(RideError::Forbidden("not a party to this match".into()));
            }
            if ride_match.status.is_terminal() {
                return Err(RideError::InvalidState(format!(
                    "match {} is already {:?}",
                    match_id, ride_match.status
                )));
            }
            let now = self.clock.now();
            if ride_match.is_overdue(now) {
                return Err(RideError::InvalidState(format!("match {} has expired", match_id)));
            }

            match decision {
                MatchDecision::Reject => ride_match.transition(MatchStatus::Rejected, now)?,
                MatchDecision::Accept => {
                    if !self.store.claim_request(ride_match.request_id, match_id).await {
                        return Err(RideError::InvalidState(format!(
                            "request {} already has an accepted match",
                            ride_match.request_id
                        )));
                    }
                    match self.reserve(&mut ride_match, now).await {
                        Ok(filled) => events.extend(filled),
                        Err(e) => {
                            self.store.release_request(ride_match.request_id).await;
                            return Err(e);
                        }
                    }
                }
            }
            ride_match.clone()
        };

        info!("Match {} is now {:?}", match_id, decided.status);
        events.insert(0, resolved_event(&decided));

        if decided.status == MatchStatus::Accepted {
            events.extend(self.withdraw_siblings(&decided).await);
        }
        Ok((decided, events))
    }

    /// Takes seats on the match's intent and accepts the match. Lock order is
    /// always match, then intent.
    async fn reserve(&self, ride_match: &mut RideMatch, now: DateTime<Utc>) -> Result<Vec<DomainEvent>> {
        let intent_row = self
            .store
            .intents
            .get(ride_match.intent_id)
            .await
            .ok_or_else(|| RideError::not_found("intent", ride_match.intent_id))?;
        let mut intent = intent_row.lock().await;
        if intent.status != IntentStatus::Active {
            return Err(RideError::InvalidState(format!(
                "intent {} is {:?}",
                intent.id, intent.status
            )));
        }
        if ride_match.passenger_count > intent.available_seats {
            return Err(RideError::InvalidState(format!(
                "intent {} has {} seat(s), match needs {}",
                intent.id, intent.available_seats, ride_match.passenger_count
            )));
        }
        ride_match.transition(MatchStatus::Accepted, now)?;
        intent.reserve_seats(ride_match.passenger_count);

        let mut events = Vec::new();
        if intent.status == IntentStatus::Inactive {
            events.push(DomainEvent::IntentFilled {
                intent_id: intent.id,
                driver_user_id: intent.driver_user_id,
            });
        }
        Ok(events)
    }

    /// Other candidates of an accepted request are no longer needed.
    async fn withdraw_siblings(&self, accepted: &RideMatch) -> Vec<DomainEvent> {
        let siblings = self
            .store
            .matches
            .select(|m| {
                m.request_id == accepted.request_id && m.id != accepted.id && m.status == MatchStatus::Pending
            })
            .await;

        let mut events = Vec::new();
        let now = self.clock.now();
        for sibling in siblings {
            let Some(row) = self.store.matches.get(sibling.id).await else {
                continue;
            };
            let mut ride_match = row.lock().await;
            if ride_match.transition(MatchStatus::Rejected, now).is_ok() {
                debug!("Withdrew sibling match {}", ride_match.id);
                events.push(resolved_event(&ride_match));
            }
        }
        events
    }

    /// Expires every pending match whose decision window has closed.
    pub async fn expire_overdue(&self) -> Vec<DomainEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();
        for row in self.store.matches.handles().await {
            let mut ride_match = row.lock().await;
            if ride_match.is_overdue(now) && ride_match.transition(MatchStatus::Expired, now).is_ok() {
                info!("Match {} expired without a decision", ride_match.id);
                events.push(resolved_event(&ride_match));
            }
        }
        events
    }

    pub async fn ride_match(&self, match_id: Uuid) -> Result<RideMatch> {
        self.store
            .matches
            .snapshot(match_id)
            .await
            .ok_or_else(|| RideError::not_found("match", match_id))
    }

    /// Matches the user is a party to, newest first.
    pub async fn matches_for_user(&self, user_id: Uuid) -> Vec<RideMatch> {
        let mut matches = self
            .store
            .matches
            .select(|m| m.driver_user_id == user_id || m.passenger_user_id == user_id)
            .await;
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches
    }
}

fn resolved_event(ride_match: &RideMatch) -> DomainEvent {
    DomainEvent::MatchResolved {
        match_id: ride_match.id,
        driver_user_id: ride_match.driver_user_id,
        passenger_user_id: ride_match.passenger_user_id,
        status: ride_match.status,
    }
}

fn validate_request(request: &RideRequest) -> Result<u32> {
    if request.passenger_count <= 0 {
        return Err(RideError::InvalidRequest(format!(
            "passenger count must be positive, got {}",
            request.passenger_count
        )));
    }
    let count = u32::try_from(request.passenger_count)
        .map_err(|_| RideError::InvalidRequest("passenger count too large".into()))?;
    if !request.pickup.point.is_valid() || !request.drop.point.is_valid() {
        return Err(RideError::InvalidRequest("coordinates out of range".into()));
    }
    if request.pickup.point == request.drop.point {
        return Err(RideError::InvalidRequest("pickup and drop must differ".into()));
    }
    Ok(count)
}

/// Ascending detour, then descending rating, then oldest intent first.
fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.detour_km
            .total_cmp(&b.detour_km)
            .then_with(|| b.driver.rating.total_cmp(&a.driver.rating))
            .then_with(|| a.intent.created_at.cmp(&b.intent.created_at))
            .then_with(|| a.intent.id.cmp(&b.intent.id))
    });
}

fn window_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> Duration {
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    if end > start { end - start } else { Duration::zero() }
}

/// The occurrence of `intent` closest to `requested`.
///
/// Daily and weekly intents repeat at the same local wall-clock time in
/// `tz`; no occurrence precedes the intent's first start.
fn occurrence_near(intent: &DriverIntent, requested: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    if intent.recurrence == Recurrence::OneTime {
        return Some(intent.start_time);
    }

    let first = intent.start_time.with_timezone(&tz);
    let wall_clock = first.time();
    let anchor: NaiveDate = requested.with_timezone(&tz).date_naive();

    (-8..=8)
        .filter_map(|offset| anchor.checked_add_signed(Duration::days(offset)))
        .filter(|date| intent.recurrence == Recurrence::Daily || date.weekday() == first.weekday())
        .filter_map(|date| tz.from_local_datetime(&date.and_time(wall_clock)).earliest())
        .map(|local| local.with_timezone(&Utc))
        .filter(|occurrence| *occurrence >= intent.start_time)
        .min_by_key(|occurrence| (*occurrence - requested).num_seconds().abs())
}
