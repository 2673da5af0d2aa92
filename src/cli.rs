use dialoguer::{Confirm, Input, Password};
use std::path::PathBuf;
use std::sync::Arc;

use carin::auth::AuthService;
use carin::client::ApiClient;
use carin::config::{default_config_path, CliConfig, ClientConfig};
use carin::coordinator::RefreshCoordinator;
use carin::error::{CarinError, Result};
use carin::routes::RouteService;
use carin::store::CredentialStore;
use carin::transport::HttpTransport;
use carin::users::UserService;
use carin::vehicles::VehicleService;
use carin::version::format_version_info;
use carin_protocol::{
    CreateRouteRequest, CreateVehicleRequest, ListQuery, Location, Paginated, Route,
    UpdateRouteRequest, UpdateVehicleRequest, User, Vehicle,
};

use crate::ui::{format_remaining, UI};
use crate::{
    Commands, ConfigArgs, ConfigCommand, CreateRouteArgs, CreateVehicleArgs, ListArgs, LoginArgs,
    RoutesArgs, RoutesCommand, UpdateRouteArgs, UpdateVehicleArgs, UsersArgs, UsersCommand,
    VehiclesArgs, VehiclesCommand,
};

type Coordinator = RefreshCoordinator<HttpTransport>;

/// CLI handler for processing commands
pub struct CliHandler {
    config_path: Option<PathBuf>,
    ui: UI,
}

impl CliHandler {
    /// Create a new CLI handler with a custom config path
    pub fn with_config_path(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            ui: UI::new(),
        }
    }

    fn config_file(&self) -> PathBuf {
        self.config_path.clone().unwrap_or_else(default_config_path)
    }

    async fn load_config(&self) -> Result<CliConfig> {
        CliConfig::load(Some(&self.config_file())).await
    }

    /// Wire store, transport and coordinator from the saved settings
    async fn connect(&self) -> Result<(ClientConfig, Arc<Coordinator>)> {
        let cli_config = self.load_config().await?;
        let client_config = cli_config.to_client_config()?;
        let store = Arc::new(CredentialStore::new(
            client_config.token_storage.clone().into(),
        )?);
        let transport = HttpTransport::new(client_config.clone())?;
        let coordinator = Arc::new(RefreshCoordinator::from_config(
            transport,
            store,
            &client_config,
        ));
        Ok((client_config, coordinator))
    }

    /// Like `connect`, but refuses to go on without a stored session
    async fn authenticated_client(&self) -> Result<ApiClient<HttpTransport>> {
        let (_, coordinator) = self.connect().await?;
        if !coordinator.store().has_credential() {
            return Err(CarinError::not_authenticated());
        }
        Ok(ApiClient::new(coordinator))
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.handle_login(args).await,
            Commands::Logout => self.handle_logout().await,
            Commands::Status => self.handle_status().await,
            Commands::Users(args) => self.handle_users(args).await,
            Commands::Vehicles(args) => self.handle_vehicles(args).await,
            Commands::Routes(args) => self.handle_routes(args).await,
            Commands::Config(args) => self.handle_config(args).await,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────

    async fn handle_login(&mut self, args: LoginArgs) -> Result<()> {
        let (_, coordinator) = self.connect().await?;
        let auth = AuthService::new(coordinator);

        let email = match args.email {
            Some(email) => email,
            None => Input::<String>::new()
                .with_prompt("Email")
                .interact_text()?,
        };
        let password = Password::new().with_prompt("Password").interact()?;

        let identity = auth.login(&email, &password).await?;
        self.ui.success(&format!(
            "Signed in as {} ({})",
            identity.full_name(),
            identity.role
        ));
        Ok(())
    }

    async fn handle_logout(&mut self) -> Result<()> {
        let (_, coordinator) = self.connect().await?;
        AuthService::new(coordinator).logout()?;
        self.ui.success("Signed out");
        Ok(())
    }

    async fn handle_status(&mut self) -> Result<()> {
        let (client_config, coordinator) = self.connect().await?;
        let status = AuthService::new(coordinator).status()?;

        let mut rows = vec![
            ("Version", format_version_info()),
            ("Endpoint", client_config.base_url.clone()),
            (
                "Authentication",
                self.ui
                    .format_auth_status(status.authenticated, status.renewal_due),
            ),
        ];

        if let Some(identity) = &status.identity {
            rows.push(("Name", identity.full_name()));
            rows.push(("Email", identity.email.clone()));
            rows.push(("Role", identity.role.clone()));
        }
        if let Some(remaining) = status.remaining_secs {
            rows.push(("Token lifetime", format_remaining(remaining)));
        }

        self.ui.card("Status", rows);
        if status.renewal_due {
            self.ui
                .warning("The access token is about to expire; the next command renews it.");
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Fleet
    // ─────────────────────────────────────────────────────────────

    async fn handle_users(&mut self, args: UsersArgs) -> Result<()> {
        let users = UserService::new(&self.authenticated_client().await?);

        match args.command {
            UsersCommand::List { list, role } => {
                let query = list_query(&list, role);
                let page = users.list(&query).await?;
                self.print_users(&page, query.page);
            }
            UsersCommand::Get { id } => {
                let user = users.get(&id).await?;
                self.ui.card(
                    &user.full_name(),
                    vec![
                        ("ID", user.id.clone()),
                        ("Email", user.email.clone()),
                        ("Role", user.role.clone()),
                        ("Image", self.ui.format_field(user.image_url.clone())),
                    ],
                );
            }
        }
        Ok(())
    }

    async fn handle_vehicles(&mut self, args: VehiclesArgs) -> Result<()> {
        let vehicles = VehicleService::new(&self.authenticated_client().await?);

        match args.command {
            VehiclesCommand::List { list, status } => {
                let query = list_query(&list, status);
                let page = vehicles.list(&query).await?;
                self.print_vehicles(&page, query.page);
            }
            VehiclesCommand::Get { id } => {
                let vehicle = vehicles.get(&id).await?;
                self.print_vehicle(&vehicle);
            }
            VehiclesCommand::Total => {
                let total = vehicles.total().await?;
                println!("{}", total);
            }
            VehiclesCommand::Create(args) => {
                let vehicle = vehicles.create(&create_vehicle_request(args)).await?;
                self.ui.success(&format!(
                    "Vehicle {} registered with id {}",
                    vehicle.license_plate, vehicle.id
                ));
            }
            VehiclesCommand::Update(args) => {
                let id = args.id.clone();
                let vehicle = vehicles.update(&id, &update_vehicle_request(args)).await?;
                self.ui.success(&format!("Vehicle {} updated", vehicle.license_plate));
                self.print_vehicle(&vehicle);
            }
        }
        Ok(())
    }

    async fn handle_routes(&mut self, args: RoutesArgs) -> Result<()> {
        let routes = RouteService::new(&self.authenticated_client().await?);

        match args.command {
            RoutesCommand::List { list, status } => {
                let query = list_query(&list, status);
                let page = routes.list(&query).await?;
                self.print_routes(&page, query.page);
            }
            RoutesCommand::Get { id } => {
                let details = routes.details(&id).await?;
                let driver = match &details.driver {
                    Some(user) => format!("{} ({})", user.full_name(), user.email),
                    None => details.route.user_id.clone(),
                };
                let vehicle = match &details.vehicle {
                    Some(v) => format!("{} {} ({})", v.brand, v.model, v.license_plate),
                    None => details.route.vehicle_id.clone(),
                };
                self.print_route(&details.route, driver, vehicle);
            }
            RoutesCommand::Total => {
                let total = routes.total().await?;
                println!("{}", total);
            }
            RoutesCommand::Create(args) => {
                let route = routes.create(&create_route_request(args)).await?;
                self.ui.success(&format!(
                    "Route {} → {} planned with id {}",
                    route.start_point, route.end_point, route.id
                ));
            }
            RoutesCommand::Update(args) => {
                let id = args.id.clone();
                let route = routes.update(&id, &update_route_request(args)).await?;
                self.ui.success("Route updated");
                self.print_route(&route, route.user_id.clone(), route.vehicle_id.clone());
            }
            RoutesCommand::Delete { id, force } => {
                if !force {
                    let confirmed = Confirm::new()
                        .with_prompt(format!("Delete route {}?", id))
                        .default(false)
                        .interact()?;
                    if !confirmed {
                        return Err(CarinError::user_cancelled());
                    }
                }
                routes.delete(&id).await?;
                self.ui.success(&format!("Route {} deleted", id));
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Config
    // ─────────────────────────────────────────────────────────────

    async fn handle_config(&mut self, args: ConfigArgs) -> Result<()> {
        let path = self.config_file();
        let mut config = self.load_config().await?;

        match args.command {
            ConfigCommand::Show => {
                self.ui.card(
                    "Configuration",
                    vec![
                        ("File", path.display().to_string()),
                        ("Endpoint", config.endpoint.clone()),
                        ("Timeout", format!("{}s", config.timeout)),
                        ("Storage", config.storage_dir.display().to_string()),
                        ("Keep session", yes_no(config.token_storage_enabled)),
                        (
                            "Maps API key",
                            if config.maps_api_key.is_some() { "set" } else { "not set" }
                                .to_string(),
                        ),
                    ],
                );
                return Ok(());
            }
            ConfigCommand::SetEndpoint { url } => {
                let candidate = ClientConfig {
                    base_url: url.clone(),
                    ..ClientConfig::default()
                };
                candidate.validate()?;
                config.endpoint = url;
            }
            ConfigCommand::SetTimeout { seconds } => {
                if seconds == 0 {
                    return Err(CarinError::invalid_input("Timeout must be at least 1 second"));
                }
                config.timeout = seconds;
            }
            ConfigCommand::SetMapsKey { key } => {
                config.maps_api_key = Some(key).filter(|k| !k.trim().is_empty());
            }
            ConfigCommand::Reset => {
                let confirmed = Confirm::new()
                    .with_prompt("Reset all settings to defaults?")
                    .default(false)
                    .interact()?;
                if !confirmed {
                    return Err(CarinError::user_cancelled());
                }
                config = CliConfig::default();
            }
        }

        config.save(&path).await?;
        self.ui.success("Configuration saved");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Output
    // ─────────────────────────────────────────────────────────────

    fn print_users(&self, page: &Paginated<User>, current: u32) {
        if page.data.is_empty() {
            self.ui.info("No users found");
            return;
        }
        let rows: Vec<Vec<String>> = page
            .data
            .iter()
            .map(|u| vec![u.id.clone(), u.full_name(), u.email.clone(), u.role.clone()])
            .collect();
        self.ui.table(&["ID", "Name", "Email", "Role"], &rows);
        self.ui
            .page_footer(current, page.page_count(), page.meta.total_items);
    }

    fn print_vehicles(&self, page: &Paginated<Vehicle>, current: u32) {
        if page.data.is_empty() {
            self.ui.info("No vehicles found");
            return;
        }
        let rows: Vec<Vec<String>> = page
            .data
            .iter()
            .map(|v| {
                vec![
                    v.id.clone(),
                    v.license_plate.clone(),
                    format!("{} {}", v.brand, v.model),
                    v.category.clone(),
                    format!("{:.0}", v.kms),
                    self.ui.format_vehicle_status(v.status),
                ]
            })
            .collect();
        self.ui
            .table(&["ID", "Plate", "Vehicle", "Category", "Kms", "Status"], &rows);
        self.ui
            .page_footer(current, page.page_count(), page.meta.total_items);
    }

    fn print_vehicle(&self, vehicle: &Vehicle) {
        self.ui.card(
            &format!("{} {}", vehicle.brand, vehicle.model),
            vec![
                ("ID", vehicle.id.clone()),
                ("License plate", vehicle.license_plate.clone()),
                ("VIN", vehicle.vin.clone()),
                ("Color", vehicle.color.clone()),
                ("Category", vehicle.category.clone()),
                ("Capacity", vehicle.capacity.to_string()),
                ("Fuel", vehicle.fuel_type.clone()),
                (
                    "Consumption",
                    format!("{:.1}", vehicle.average_fuel_consumption),
                ),
                ("Kms", format!("{:.0}", vehicle.kms)),
                ("Registered", vehicle.register_date.format("%Y-%m-%d").to_string()),
                ("Acquired", vehicle.acquisition_date.format("%Y-%m-%d").to_string()),
                ("Status", self.ui.format_vehicle_status(vehicle.status)),
            ],
        );
    }

    fn print_routes(&self, page: &Paginated<Route>, current: u32) {
        if page.data.is_empty() {
            self.ui.info("No routes found");
            return;
        }
        let rows: Vec<Vec<String>> = page
            .data
            .iter()
            .map(|r| {
                vec![
                    r.id.clone(),
                    r.start_point.to_string(),
                    r.end_point.to_string(),
                    r.start_date.format("%Y-%m-%d %H:%M").to_string(),
                    format!("{:.1} km", r.distance),
                    self.ui.format_route_status(r.status),
                ]
            })
            .collect();
        self.ui
            .table(&["ID", "From", "To", "Start", "Distance", "Status"], &rows);
        self.ui
            .page_footer(current, page.page_count(), page.meta.total_items);
    }

    fn print_route(&self, route: &Route, driver: String, vehicle: String) {
        self.ui.card(
            &format!("{} → {}", route.start_point, route.end_point),
            vec![
                ("ID", route.id.clone()),
                ("Driver", driver),
                ("Vehicle", vehicle),
                ("Start", route.start_date.format("%Y-%m-%d %H:%M").to_string()),
                (
                    "Estimated end",
                    self.ui.format_field(
                        route
                            .estimated_end_date
                            .map(|d| d.format("%Y-%m-%d %H:%M").to_string()),
                    ),
                ),
                ("Distance", format!("{:.1} km", route.distance)),
                (
                    "Duration",
                    self.ui
                        .format_field(Some(route.duration.clone()).filter(|d| !d.is_empty())),
                ),
                ("Avoid tolls", yes_no(route.avoid_tolls)),
                ("Avoid highways", yes_no(route.avoid_highways)),
                ("Status", self.ui.format_route_status(route.status)),
            ],
        );
    }
}

fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}

fn list_query(args: &ListArgs, filter: Option<String>) -> ListQuery {
    ListQuery {
        search: args.search.clone(),
        filter,
        page: args.page.max(1),
        per_page: args.per_page.max(1),
    }
}

fn create_vehicle_request(args: CreateVehicleArgs) -> CreateVehicleRequest {
    CreateVehicleRequest {
        brand: args.brand,
        model: args.model,
        license_plate: args.license_plate,
        vin: args.vin,
        color: args.color,
        register_date: args.register_date,
        acquisition_date: args.acquisition_date,
        category: args.category,
        kms: args.kms,
        capacity: args.capacity,
        fuel_type: args.fuel_type,
        average_fuel_consumption: args.average_fuel_consumption,
    }
}

fn update_vehicle_request(args: UpdateVehicleArgs) -> UpdateVehicleRequest {
    UpdateVehicleRequest {
        status: args.status,
        kms: args.kms,
        color: args.color,
        license_plate: args.license_plate,
        category: args.category,
        average_fuel_consumption: args.average_fuel_consumption,
        ..Default::default()
    }
}

fn create_route_request(args: CreateRouteArgs) -> CreateRouteRequest {
    let mut request = CreateRouteRequest::new(
        args.user,
        args.vehicle,
        Location {
            city: args.from_city,
            country: args.from_country,
            coordinates: None,
        },
        Location {
            city: args.to_city,
            country: args.to_country,
            coordinates: None,
        },
        args.start_date,
    );
    request.avoid_tolls = args.avoid_tolls;
    request.avoid_highways = args.avoid_highways;
    request
}

fn update_route_request(args: UpdateRouteArgs) -> UpdateRouteRequest {
    UpdateRouteRequest {
        status: args.status,
        vehicle_id: args.vehicle,
        user_id: args.user,
        start_date: args.start_date,
        avoid_tolls: args.avoid_tolls,
        avoid_highways: args.avoid_highways,
        ..Default::default()
    }
}
