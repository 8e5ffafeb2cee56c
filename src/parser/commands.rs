//! Statements that drive the book, the windows and the dependency host.

use std::thread;

use crate::book::BookError;
use crate::host::recipes::DISCORD;
use crate::host::window::GameObject;
use crate::host::HostError;
use crate::log::Level;
use crate::parser::eval::{parse_float, parse_int};
use crate::parser::exec::Interpreter;
use crate::parser::tokens::is_valid_name;
use crate::parser::vars::{display_list, Variable};
use crate::parser::{is_bracketed, parse_list, split_args, trim, unquote};

const DISCORD_ACTIONS: &str = "conectar, enviar, estado, canal, conectado, registrar_slash, \
configurar_prefijo, registrar_manejador, iniciar_bot_real, mantener_activo";

impl Interpreter {
    /// Every comma-separated argument, evaluated as text.
    fn text_args(&mut self, rest: &str) -> Vec<String> {
        let mut eval = self.eval();
        split_args(rest).into_iter().map(|arg| eval.text(arg)).collect()
    }

    fn book_error(&mut self, e: BookError) {
        if e.is_notice() {
            self.console.print(&e.to_string());
        } else {
            self.report(Level::Error, &e.to_string());
        }
    }

    fn host_error(&mut self, e: HostError) {
        self.report(Level::Error, &e.to_string());
    }

    pub(super) fn book_statement(&mut self, rest: &str) {
        let args = self.text_args(rest);
        let Some((action, args)) = args.split_first() else {
            self.report(Level::Error, "libro necesita al menos 1 parametro");
            return;
        };
        let result = match (action.as_str(), args) {
            ("crear", [name, ..]) => self.book.create(name).map(|path| {
                format!("Archivo '{}' creado exitosamente", path.display())
            }),
            ("abrir", [name, ..]) => match self.book.open(name) {
                Ok(loaded) => {
                    for warning in &loaded.warnings {
                        self.report(Level::Warn, warning);
                    }
                    Ok(format!(
                        "Archivo '{}' abierto exitosamente ({} entradas válidas cargadas)",
                        loaded.path.display(),
                        loaded.entries
                    ))
                }
                Err(e) => Err(e),
            },
            ("guardar", args) => self
                .book
                .save(args.first().map(String::as_str))
                .map(|(path, count)| {
                    format!(
                        "Archivo guardado exitosamente: {} ({} entradas válidas)",
                        path.display(),
                        count
                    )
                }),
            ("escribir", [key, value, ..]) => self
                .book
                .write(key, value)
                .map(|_| format!("Dato escrito: {} = {}", key, value)),
            ("leer", [key, ..]) => Ok(match self.book.read(key) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => format!("Clave '{}' no encontrada", key),
            }),
            ("obtener", [key, var, ..]) => {
                self.fetch(key, var);
                return;
            }
            ("existe", _) => return,
            ("borrar", [key, ..]) => self
                .book
                .delete(key)
                .map(|_| format!("Clave '{}' eliminada", key)),
            ("agregar", [key, value, ..]) => self
                .book
                .add(key, value)
                .map(|_| format!("Elemento '{}' agregado a la lista '{}'", value, key)),
            ("quitar", [key, target, ..]) => match parse_int(target) {
                Some(index) => self.book.remove_at(key, index).map(|removed| {
                    format!(
                        "Elemento '{}' (índice {}) eliminado de la lista '{}'",
                        removed, index, key
                    )
                }),
                None => self
                    .book
                    .remove(key, target)
                    .map(|_| format!("Elemento '{}' eliminado de la lista '{}'", target, key)),
            },
            ("listar", _) => {
                self.list_book();
                return;
            }
            ("limpiar", _) => self
                .book
                .clear()
                .map(|_| "Todos los datos han sido eliminados del archivo".to_string()),
            ("crear", _) | ("abrir", _) => {
                let message = format!("libro \"{}\" necesita el nombre del archivo", action);
                self.report(Level::Error, &message);
                return;
            }
            ("escribir", _) => return self.missing(action, "clave y valor"),
            ("leer", _) | ("borrar", _) => return self.missing(action, "la clave"),
            ("obtener", _) => return self.missing(action, "clave y variable destino"),
            ("agregar", _) => return self.missing(action, "clave de lista y valor"),
            ("quitar", _) => return self.missing(action, "clave de lista y valor/indice"),
            (other, _) => {
                let message = format!("Accion de libro no reconocida: {}", other);
                self.report(Level::Error, &message);
                return;
            }
        };
        match result {
            Ok(message) => self.console.print(&message),
            Err(e) => self.book_error(e),
        }
    }

    fn missing(&mut self, action: &str, what: &str) {
        self.report(
            Level::Error,
            &format!("libro \"{}\" necesita {}", action, what),
        );
    }

    /// `libro "obtener"`: copies a book value into the namespace its text suggests.
    fn fetch(&mut self, key: &str, var: &str) {
        if !is_valid_name(var) {
            self.report(
                Level::Error,
                &format!("'{}' no es un nombre de variable valido", var),
            );
            return;
        }
        let Some(value) = self.book.read(key).filter(|v| !v.is_empty()) else {
            self.report(Level::Debug, &format!("Clave '{}' no encontrada", key));
            return;
        };
        let value = value.to_string();
        let vars = &mut self.ctx.vars;
        if is_bracketed(&value) {
            let items = parse_list(&value);
            vars.set(var, Variable::Text(display_list(&items)));
            vars.set(var, Variable::List(items));
        } else if value.contains('.') {
            match parse_float(&value) {
                Some(f) => vars.set(var, Variable::Float(f)),
                None => vars.set(var, Variable::Text(value)),
            }
        } else {
            match parse_int(&value) {
                Some(n) => vars.set(var, Variable::Int(n)),
                None => vars.set(var, Variable::Text(value)),
            }
        }
    }

    fn list_book(&mut self) {
        let listed = self.book.list().map(|entries| {
            entries
                .into_iter()
                .map(|(key, kind, value)| format!("{} ({}): {}", key, kind, value))
                .collect::<Vec<_>>()
        });
        let lines = match listed {
            Ok(lines) => lines,
            Err(e) => return self.book_error(e),
        };
        if self.book.is_empty() {
            self.console.print("El archivo está vacío");
            return;
        }
        let path = self
            .book
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.console
            .print(&format!("=== Contenido del archivo {} ===", path));
        for line in &lines {
            self.console.print(line);
        }
        self.console
            .print(&format!("=== Total: {} entradas válidas ===", lines.len()));
    }

    pub(super) fn counter(&mut self, rest: &str) {
        let args = self.text_args(rest);
        let title = args.first().map_or("Ventana Pancracio", String::as_str);
        let color = args.get(1).map_or("blanco", String::as_str);
        self.windows.create(title, color, false);
    }

    pub(super) fn window_write(&mut self, rest: &str) {
        let args = self.text_args(rest);
        let [title, text, ..] = args.as_slice() else {
            self.report(Level::Error, "escribir necesita al menos 2 parametros");
            return;
        };
        if let Err(e) = self.windows.write(title, text) {
            self.host_error(e);
        }
    }

    pub(super) fn game(&mut self, rest: &str) {
        let args = self.text_args(rest);
        let title = args.first().map_or("Juego Pancracio", String::as_str);
        self.windows.create(title, "negro", true);
    }

    fn object_mut(&mut self, window: &str, name: &str) -> Option<&mut GameObject> {
        self.windows.game_mut(window)?.objects.get_mut(name)
    }

    pub(super) fn object(&mut self, rest: &str) {
        let args = split_args(rest);
        if args.len() < 6 {
            self.report(Level::Error, "objeto necesita al menos 6 parametros");
            return;
        }
        let (window, name, object) = {
            let mut eval = self.eval();
            let window = eval.text(args[0]);
            let name = eval.text(args[1]);
            let color = match args.get(6) {
                Some(color) => eval.text(color),
                None => "blanco".to_string(),
            };
            let object = GameObject::new(
                eval.int(args[2]),
                eval.int(args[3]),
                eval.int(args[4]),
                eval.int(args[5]),
                &color,
            );
            (window, name, object)
        };
        match self.windows.game_mut(&window) {
            Some(win) => {
                win.objects.insert(name, object);
            }
            None => self.report(
                Level::Error,
                &format!("Ventana de juego '{}' no encontrada", window),
            ),
        }
    }

    /// Evaluates `window, name` plus `extra` integer arguments.
    fn object_args(&mut self, rest: &str, extra: usize, usage: &str) -> Option<(String, String, Vec<i64>)> {
        let args = split_args(rest);
        if args.len() < 2 + extra {
            self.report(Level::Error, usage);
            return None;
        }
        let mut eval = self.eval();
        let window = eval.text(args[0]);
        let name = eval.text(args[1]);
        let numbers = args[2..2 + extra].iter().map(|a| eval.int(a)).collect();
        Some((window, name, numbers))
    }

    fn missing_object(&mut self, name: &str) {
        self.report(Level::Error, &format!("Objeto '{}' no encontrado", name));
    }

    pub(super) fn move_object(&mut self, rest: &str) {
        let Some((window, name, v)) = self.object_args(rest, 2, "mover necesita al menos 4 parametros") else {
            return;
        };
        match self.object_mut(&window, &name) {
            Some(object) => {
                object.vx = v[0];
                object.vy = v[1];
            }
            None => self.missing_object(&name),
        }
    }

    pub(super) fn place(&mut self, rest: &str) {
        let Some((window, name, p)) = self.object_args(rest, 2, "posicionar necesita 4 parametros") else {
            return;
        };
        match self.object_mut(&window, &name) {
            Some(object) => {
                object.x = p[0];
                object.y = p[1];
            }
            None => self.missing_object(&name),
        }
    }

    pub(super) fn hide(&mut self, rest: &str) {
        let Some((window, name, _)) = self.object_args(rest, 0, "ocultar necesita 2 parametros") else {
            return;
        };
        match self.object_mut(&window, &name) {
            Some(object) => object.visible = false,
            None => self.missing_object(&name),
        }
    }

    pub(super) fn import(&mut self, rest: &str) {
        let name = unquote(trim(rest));
        match self.recipes.load(name) {
            Ok(info) => {
                debug!("dependencia '{}' version '{}' en {}", info.name, info.version, info.path.display());
                self.console
                    .print(&format!("Dependencia '{}' cargada exitosamente", name));
            }
            Err(e) => {
                let message = format!("No se pudo cargar la dependencia '{}': {}", name, e);
                self.report(Level::Error, &message);
                return;
            }
        }
        if name != DISCORD || !self.book.is_open() {
            return;
        }
        let token = self.book.read("discord_token").unwrap_or_default().to_string();
        let bot_id = self.book.read("discord_bot_id").unwrap_or_default().to_string();
        if !token.is_empty() && !bot_id.is_empty() {
            self.connect(&token, &bot_id);
        }
    }

    fn connect(&mut self, token: &str, bot_id: &str) {
        match self.recipes.connect(token, bot_id) {
            Ok(()) => self.console.print("Conexión establecida con Discord API"),
            Err(e) => self.host_error(e),
        }
    }

    pub(super) fn discord(&mut self, rest: &str) {
        if !self.recipes.is_loaded(DISCORD) {
            self.report(
                Level::Error,
                "Primero debe cargar la dependencia Discord con: receta \"la_receta_de_discord\"",
            );
            return;
        }
        let args = self.text_args(rest);
        let Some((action, args)) = args.split_first() else {
            self.report(Level::Error, "discord necesita al menos 1 parámetro");
            return;
        };
        let result = match (action.as_str(), args) {
            ("conectar", [token, bot_id, ..]) => {
                self.connect(token, bot_id);
                Ok(())
            }
            ("enviar", [channel, message, ..]) => self.recipes.send(channel, message),
            ("estado", [status, activity, ..]) => self.recipes.set_status(status, activity),
            ("registrar_slash", [name, description, ..]) => {
                self.recipes.register_slash(name, description)
            }
            ("configurar_prefijo", [prefix, ..]) => {
                self.recipes.set_prefix(prefix);
                self.console.print(&format!("Prefijo configurado: {}", prefix));
                Ok(())
            }
            ("registrar_manejador", [kind, procedure, ..]) => {
                self.recipes.register_handler(kind, procedure)
            }
            ("iniciar_bot_real", [channel, ..]) => self.recipes.start_bot(channel),
            ("canal", [channel, ..]) => self.recipes.channel_info(channel).map(|name| {
                self.console
                    .print(&format!("Canal: #{} (ID: {})", name, channel));
            }),
            ("conectado", [var, ..]) => {
                if is_valid_name(var) {
                    let connected = self.recipes.is_connected() as i64;
                    self.ctx.vars.set(var, Variable::Int(connected));
                } else {
                    let message = format!("'{}' no es un nombre de variable valido", var);
                    self.report(Level::Error, &message);
                }
                Ok(())
            }
            ("conectado", []) => {
                let connected = self.recipes.is_connected();
                self.console.print(&connected.to_string());
                Ok(())
            }
            ("mantener_activo", _) => self.keep_alive(),
            ("conectar", _) => return self.discord_usage(action, "token y bot_id"),
            ("enviar", _) => return self.discord_usage(action, "canal_id y mensaje"),
            ("estado", _) => return self.discord_usage(action, "status y actividad"),
            ("registrar_slash", _) => return self.discord_usage(action, "comando y descripción"),
            ("configurar_prefijo", _) => return self.discord_usage(action, "el prefijo"),
            ("registrar_manejador", _) => return self.discord_usage(action, "tipo y función"),
            ("iniciar_bot_real", _) | ("canal", _) => return self.discord_usage(action, "canal_id"),
            (other, _) => {
                let message = format!(
                    "Acción de discord no reconocida: {}. Acciones disponibles: {}",
                    other, DISCORD_ACTIONS
                );
                self.report(Level::Error, &message);
                return;
            }
        };
        if let Err(e) = result {
            self.host_error(e);
        }
    }

    fn discord_usage(&mut self, action: &str, what: &str) {
        self.report(
            Level::Error,
            &format!("discord \"{}\" necesita {}", action, what),
        );
    }

    /// Blocks forever, printing a status line every few heartbeats.
    fn keep_alive(&mut self) -> ! {
        self.console.print("Manteniendo bot activo...");
        self.console.print("Presiona Ctrl+C para detener");
        let heartbeat = self.settings.heartbeat;
        let mut ticks: u64 = 0;
        loop {
            thread::sleep(heartbeat);
            ticks += 1;
            let elapsed = heartbeat.as_secs() * ticks;
            if ticks % 4 == 0 {
                if self.recipes.is_connected() {
                    self.console
                        .print(&format!("Bot online - {} segundos activo", elapsed));
                } else {
                    self.console.print("Bot desconectado - Verificando...");
                }
            }
            if ticks % 10 == 0 {
                self.console.print(&format!(
                    "Bot ha estado activo por {} minutos",
                    elapsed / 60
                ));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use crate::book::test_dir;
    use crate::parser::exec::test::{interpreter, lines};

    fn book_name(dir: &std::path::Path, name: &str) -> String {
        dir.join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn book_statements() {
        let dir = test_dir("commands_book");
        let name = book_name(&dir, "datos");
        let (mut interp, console) = interpreter(&[]);
        interp.run(&lines(&format!(
            "libro \"crear\", \"{name}\"\n\
             libro \"escribir\", \"nombre\", \"Ana\"\n\
             libro \"escribir\", \"edad\", 30\n\
             libro \"escribir\", \"lingan\", \"x\"\n\
             libro \"agregar\", \"colores\", \"rojo\"\n\
             libro \"agregar\", \"colores\", \"azul\"\n\
             libro \"agregar\", \"colores\", \"rojo\"\n\
             libro \"quitar\", \"colores\", \"rojo\"\n\
             libro \"quitar\", \"colores\", 5\n\
             libro \"leer\", \"nombre\"\n\
             libro \"leer\", \"nada\"\n\
             libro \"listar\"\n\
             libro \"guardar\""
        )));
        let path = format!("{}.pansos", name);
        let output = console.output();
        assert_eq!(output[0], format!("Archivo '{}' creado exitosamente", path));
        assert_eq!(output[1], "Dato escrito: nombre = Ana");
        assert_eq!(output[2], "Dato escrito: edad = 30");
        assert_eq!(output[6], "Elemento 'rojo' eliminado de la lista 'colores'");
        assert_eq!(output[7], "Índice 5 fuera de rango para la lista 'colores'");
        assert_eq!(output[8], "Ana");
        assert_eq!(output[9], "Clave 'nada' no encontrada");
        assert_eq!(
            &output[10..15],
            &[
                format!("=== Contenido del archivo {} ===", path),
                "colores (lista): [\"azul\", \"rojo\"]".to_string(),
                "edad (entero): 30".to_string(),
                "nombre (texto): Ana".to_string(),
                "=== Total: 3 entradas válidas ===".to_string(),
            ]
        );
        assert!(console.mentions("Clave no válida: lingan"));

        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("nombre:texto:\"Ana\"\n"));
        assert!(!saved.contains("lingan"));
    }

    #[test]
    fn obtener_picks_namespace_from_text() {
        let dir = test_dir("commands_obtener");
        let name = book_name(&dir, "valores");
        let (mut interp, console) = interpreter(&[]);
        interp.run(&lines(&format!(
            "libro \"crear\", \"{name}\"\n\
             libro \"escribir\", \"n\", 7\n\
             libro \"escribir\", \"f\", 2.5\n\
             libro \"escribir\", \"t\", \"hola\"\n\
             libro \"agregar\", \"l\", \"a\"\n\
             libro \"agregar\", \"l\", \"b\"\n\
             libro \"obtener\", \"n\", \"n\"\n\
             libro \"obtener\", \"f\", \"f\"\n\
             libro \"obtener\", \"t\", \"t\"\n\
             libro \"obtener\", \"l\", \"l\"\n\
             libro \"obtener\", \"n\", \"1x\"\n\
             hornear l"
        )));
        let vars = interp.vars();
        assert_eq!(vars.ints.get("n"), Some(&7));
        assert_eq!(vars.floats.get("f"), Some(&2.5));
        assert_eq!(vars.texts.get("t").map(String::as_str), Some("hola"));
        assert_eq!(vars.lists.get("l").map(Vec::len), Some(2));
        assert_eq!(vars.texts.get("l").map(String::as_str), Some("a, b"));
        assert!(console.mentions("'1x' no es un nombre de variable valido"));
        assert_eq!(console.output().last().map(String::as_str), Some("a, b"));
    }

    #[test]
    fn invalid_keys_bind_and_store_nothing() {
        let dir = test_dir("commands_invalid_keys");
        let name = book_name(&dir, "claves");
        let (mut interp, console) = interpreter(&[]);
        interp.run(&lines(&format!(
            "libro \"crear\", \"{name}\"\n\
             libro \"agregar\", \"manolo perez\", \"x\"\n\
             libro \"escribir\", \"ana perez\", 3\n\
             libro \"obtener\", \"manolo perez\", \"v\"\n\
             libro \"obtener\", \"lingan\", \"w\"\n\
             libro \"listar\"\n\
             libro \"guardar\""
        )));
        let vars = interp.vars();
        for var in ["v", "w"] {
            assert!(!vars.ints.contains_key(var));
            assert!(!vars.floats.contains_key(var));
            assert!(!vars.texts.contains_key(var));
            assert!(!vars.lists.contains_key(var));
        }
        assert!(console.mentions("Clave no válida: manolo perez"));
        assert!(console.mentions("Clave no válida: ana perez"));
        assert!(console.output().iter().any(|line| line == "El archivo está vacío"));
        let saved = fs::read_to_string(format!("{}.pansos", name)).unwrap();
        assert!(!saved.contains("perez"));
    }

    #[test]
    fn existe_condition_reads_the_book() {
        let dir = test_dir("commands_existe");
        let name = book_name(&dir, "existe");
        let (mut interp, console) = interpreter(&[]);
        interp.run(&lines(&format!(
            "libro \"crear\", \"{name}\"\n\
             libro \"escribir\", \"clave\", 1\n\
             probar libro \"existe\", \"clave\":\n\
             hornear \"si\"\n\
             listo\n\
             probar libro \"existe\", \"otra\":\n\
             hornear \"no deberia\"\n\
             sino libro \"existe\", \"clave\":\n\
             hornear \"sino\"\n\
             listo"
        )));
        assert_eq!(&console.output()[2..], &["si".to_string(), "sino".to_string()]);
    }

    #[test]
    fn closed_book_errors() {
        let (mut interp, console) = interpreter(&[]);
        interp.run(&lines(
            "libro \"escribir\", \"k\", \"v\"\n\
             libro \"escribir\", \"k\"\n\
             libro \"volar\"\n\
             libro \"guardar\"",
        ));
        assert_eq!(
            console.errors(),
            vec![
                "No hay archivo abierto",
                "libro \"escribir\" necesita clave y valor",
                "Accion de libro no reconocida: volar",
                "No hay archivo especificado para guardar",
            ]
        );
    }

    #[test]
    fn window_statements() {
        let (mut interp, console) = interpreter(&[]);
        interp.run(&lines(
            "mostrador \"Hola\", \"azul\"\n\
             escribir \"Hola\", \"linea \" + 1\n\
             escribir \"Nada\", \"x\"\n\
             juego \"Arena\"\n\
             objeto \"Arena\", \"a\", 0, 0, 10, 10, \"rojo\"\n\
             objeto \"Arena\", \"b\", 50, 50, 10, 10\n\
             mover \"Arena\", \"a\", 2, 3\n\
             posicionar \"Arena\", \"b\", 5, 5\n\
             probar colision(\"Arena\", \"a\", \"b\"):\n\
             hornear \"choque\"\n\
             listo\n\
             ocultar \"Arena\", \"b\"\n\
             probar colision(\"Arena\", \"a\", \"b\"):\n\
             hornear \"otra vez\"\n\
             listo\n\
             ocultar \"Arena\", \"fantasma\"\n\
             objeto \"Nada\", \"c\", 0, 0, 1, 1",
        ));
        assert_eq!(console.output(), vec!["choque"]);
        let arena = interp.windows().game("Arena").unwrap();
        let a = &arena.objects["a"];
        assert_eq!((a.vx, a.vy, a.color.as_str()), (2, 3, "rojo"));
        assert_eq!(arena.objects["b"].color, "blanco");
        assert!(!arena.objects["b"].visible);
        assert!(console.mentions("Ventana 'Nada' no encontrada"));
        assert!(console.mentions("Objeto 'fantasma' no encontrado"));
        assert!(console.mentions("Ventana de juego 'Nada' no encontrada"));
    }

    #[test]
    fn discord_requires_the_dependency() {
        let (mut interp, console) = interpreter(&[]);
        interp.run(&lines("discord \"conectado\"\nreceta \"la_receta_de_discord\""));
        assert!(console.mentions("Primero debe cargar la dependencia Discord"));
        assert!(console.mentions("No se pudo cargar la dependencia 'la_receta_de_discord'"));
    }
}
